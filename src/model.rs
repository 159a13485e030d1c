use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Image bytes as supplied by the caller. The format is sniffed at embed time.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageAsset {
    pub data: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Party {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_lines: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoverSection {
    pub title: String,
    pub subtitle: Option<String>,
    pub client: Party,
    pub sender: Party,
    pub proposal_number: String,
    pub date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    /// Name of a decorative asset in the renderer's `AssetStore`.
    pub logo: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hyperlink {
    pub label: String,
    pub url: String,
}

/// A bullet whose text is followed by a hyperlink run on the same line.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkedItem {
    pub text: String,
    pub link: Hyperlink,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectSection {
    pub name: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub duration: Option<String>,
    /// Plain text with bullet / sub-header markers.
    pub overview: String,
    pub scope: Vec<String>,
    pub deliverables: Vec<String>,
    pub references: Vec<LinkedItem>,
}

/// `amount` is rendered as given; it is not checked against `quantity * rate`.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EstimateSection {
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Decimal,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaymentMilestone {
    pub label: String,
    pub percent: Option<Decimal>,
    pub amount: Decimal,
    pub due: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaymentSection {
    pub schedule: Vec<PaymentMilestone>,
    pub accepted_methods: Vec<String>,
    pub terms: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CustomSectionKind {
    About,
    Capabilities,
    Difference,
    Standards,
}

impl CustomSectionKind {
    pub fn default_title(self) -> &'static str {
        match self {
            CustomSectionKind::About => "About Us",
            CustomSectionKind::Capabilities => "Our Capabilities",
            CustomSectionKind::Difference => "The Difference",
            CustomSectionKind::Standards => "Standards",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SectionBody {
    Boilerplate,
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CustomSection {
    pub kind: CustomSectionKind,
    pub title: Option<String>,
    pub body: SectionBody,
    /// Decorative asset names. For `Standards` each one fills its own page.
    pub images: Vec<String>,
}

/// Held only for the duration of one render call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignatureRecord {
    pub image: Option<ImageAsset>,
    pub signer_name: String,
    pub signer_email: String,
    pub signer_title: Option<String>,
    pub signed_at_utc: Option<DateTime<Utc>>,
}

impl SignatureRecord {
    pub fn is_signed(&self) -> bool {
        self.signed_at_utc.is_some()
    }
}

pub type SenderSignatureRecord = SignatureRecord;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartyTimestamps {
    pub sent: Option<DateTime<Utc>>,
    pub viewed: Option<DateTime<Utc>>,
    pub signed: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuditTrail {
    pub certificate_ref_number: String,
    pub sender_timestamps: PartyTimestamps,
    pub sender_ip: Option<String>,
    pub client_timestamps: PartyTimestamps,
    pub client_ip: Option<String>,
    pub client_location: Option<String>,
}

/// Both parties' signatures, as captured by the signing flow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signatures {
    pub client: Option<SignatureRecord>,
    pub sender: Option<SenderSignatureRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProposalDocument {
    pub cover: CoverSection,
    pub project: ProjectSection,
    pub estimate: EstimateSection,
    pub payment: PaymentSection,
    pub custom_sections: Vec<CustomSection>,
    pub client_signature: Option<SignatureRecord>,
    pub sender_signature: Option<SenderSignatureRecord>,
    pub audit_trail: Option<AuditTrail>,
}

impl ProposalDocument {
    pub fn custom_section(&self, kind: CustomSectionKind) -> Option<&CustomSection> {
        self.custom_sections.iter().find(|s| s.kind == kind)
    }

    /// True when both parties have completed signature.
    pub fn is_fully_signed(&self) -> bool {
        self.client_signature.as_ref().is_some_and(SignatureRecord::is_signed)
            && self.sender_signature.as_ref().is_some_and(SignatureRecord::is_signed)
    }
}
