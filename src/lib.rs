mod assets;
mod boilerplate;
mod content;
mod error;
mod fonts;
mod model;
mod money;
mod pdf;
mod theme;

pub use assets::{AssetClass, AssetStore, ImageId, MissingImagePolicy, SIGNATURE_PLACEHOLDER};
pub use content::{TextBlock, parse_text_blocks};
pub use error::Error;
pub use fonts::{FontBook, FontId, FontLibrary};
pub use model::{
    AuditTrail, CoverSection, CustomSection, CustomSectionKind, EstimateSection, Hyperlink,
    ImageAsset, LineItem, LinkedItem, Party, PartyTimestamps, PaymentMilestone, PaymentSection,
    ProjectSection, ProposalDocument, SectionBody, SenderSignatureRecord, SignatureRecord,
    Signatures,
};
pub use money::{format_currency, format_percent, format_quantity};
pub use pdf::{
    DrawOp, LaidOutPage, Layout, LinkArea, Measured, Placement, PlacementKind, TextMetrics,
};
pub use theme::{
    Colors, FontClass, FontSpec, FontWeight, PageGeometry, Rgb, Spacing, TextRole, ThemeConfig,
    Typography,
};

/// A finished proposal: PDF bytes plus the page count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Renders proposals against a set of named image assets and caller fonts.
/// Holds no per-render state; one renderer may be shared across threads.
#[derive(Clone, Default)]
pub struct ProposalRenderer {
    pub assets: AssetStore,
    pub fonts: FontLibrary,
}

impl ProposalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: AssetStore) -> Self {
        Self {
            assets,
            fonts: FontLibrary::new(),
        }
    }

    /// The paginated display list, without serializing it.
    pub fn layout_proposal(&self, doc: &ProposalDocument, theme: &ThemeConfig) -> Result<Layout, Error> {
        theme.validate()?;
        Ok(pdf::layout(doc, theme, &self.fonts, &self.assets))
    }

    pub fn render_proposal(
        &self,
        doc: &ProposalDocument,
        theme: &ThemeConfig,
    ) -> Result<RenderedDocument, Error> {
        theme.validate()?;
        let (layout, bytes) = pdf::render(doc, theme, &self.fonts, &self.assets);
        Ok(RenderedDocument {
            bytes,
            page_count: layout.page_count(),
        })
    }

    /// Renders with the given signatures and audit trail applied. The
    /// certificate page appears only when both signatures carry a signing time.
    pub fn render_signed_proposal(
        &self,
        doc: &ProposalDocument,
        theme: &ThemeConfig,
        signatures: &Signatures,
        audit_trail: &AuditTrail,
    ) -> Result<RenderedDocument, Error> {
        let signed = apply_signatures(doc, signatures, audit_trail);
        self.render_proposal(&signed, theme)
    }
}

fn apply_signatures(
    doc: &ProposalDocument,
    signatures: &Signatures,
    audit_trail: &AuditTrail,
) -> ProposalDocument {
    let mut doc = doc.clone();
    if let Some(client) = &signatures.client {
        doc.client_signature = Some(client.clone());
    }
    if let Some(sender) = &signatures.sender {
        doc.sender_signature = Some(sender.clone());
    }
    doc.audit_trail = Some(audit_trail.clone());
    doc
}

pub fn render_proposal(doc: &ProposalDocument, theme: &ThemeConfig) -> Result<RenderedDocument, Error> {
    ProposalRenderer::new().render_proposal(doc, theme)
}

pub fn render_signed_proposal(
    doc: &ProposalDocument,
    theme: &ThemeConfig,
    signatures: &Signatures,
    audit_trail: &AuditTrail,
) -> Result<RenderedDocument, Error> {
    ProposalRenderer::new().render_signed_proposal(doc, theme, signatures, audit_trail)
}

pub fn layout_proposal(doc: &ProposalDocument, theme: &ThemeConfig) -> Result<Layout, Error> {
    ProposalRenderer::new().layout_proposal(doc, theme)
}
