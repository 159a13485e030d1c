//! Section content as blocks. Each builder is a pure function of the
//! document; the assembler feeds the blocks to the renderers.

use chrono::{DateTime, NaiveDate, Utc};

use crate::assets::{AssetClass, AssetResolver};
use crate::boilerplate;
use crate::content::parse_text_blocks;
use crate::model::{
    AuditTrail, CustomSectionKind, Party, PartyTimestamps, ProposalDocument, SectionBody,
    SignatureRecord,
};
use crate::money::{format_currency, format_percent, format_quantity};
use crate::theme::{TextRole, ThemeConfig};

use super::blocks::{Block, BulletItem, ImageBlock, ImageSource, SignatureColumn, text_blocks};
use super::layout::Align;
use super::table::{Cell, ColumnSpec, ColumnWidth, Table, TotalLine};

const LOGO_MAX_WIDTH: f32 = 160.0;
const LOGO_MAX_HEIGHT: f32 = 72.0;
const ILLUSTRATION_MAX_HEIGHT: f32 = 240.0;
const NOT_RECORDED: &str = "Not recorded";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SectionKind {
    Cover,
    About,
    Project,
    Estimate,
    Payment,
    Capabilities,
    Difference,
    Standards,
    Certificate,
}

impl SectionKind {
    pub(crate) const ORDER: [SectionKind; 9] = [
        SectionKind::Cover,
        SectionKind::About,
        SectionKind::Project,
        SectionKind::Estimate,
        SectionKind::Payment,
        SectionKind::Capabilities,
        SectionKind::Difference,
        SectionKind::Standards,
        SectionKind::Certificate,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            SectionKind::Cover => "cover",
            SectionKind::About => "about",
            SectionKind::Project => "project",
            SectionKind::Estimate => "estimate",
            SectionKind::Payment => "payment",
            SectionKind::Capabilities => "capabilities",
            SectionKind::Difference => "difference",
            SectionKind::Standards => "standards",
            SectionKind::Certificate => "certificate",
        }
    }
}

pub(crate) fn build<'d>(
    kind: SectionKind,
    doc: &'d ProposalDocument,
    theme: &ThemeConfig,
    assets: &mut AssetResolver,
) -> Vec<Block<'d>> {
    match kind {
        SectionKind::Cover => cover(doc, theme),
        SectionKind::About => custom(doc, CustomSectionKind::About),
        SectionKind::Project => project(doc),
        SectionKind::Estimate => estimate(doc),
        SectionKind::Payment => payment(doc),
        SectionKind::Capabilities => custom(doc, CustomSectionKind::Capabilities),
        SectionKind::Difference => custom(doc, CustomSectionKind::Difference),
        SectionKind::Standards => standards(doc, assets),
        SectionKind::Certificate => certificate(doc),
    }
}

pub(crate) fn footer_text(doc: &ProposalDocument) -> String {
    let sender = &doc.cover.sender;
    let company = sender.company.as_deref().unwrap_or(&sender.name);
    format!("{company} | Proposal {}", doc.cover.proposal_number)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => NOT_RECORDED.to_string(),
    }
}

fn party_lines(party: &Party) -> String {
    let mut lines = vec![party.name.clone()];
    lines.extend(party.company.iter().cloned());
    lines.extend(party.address_lines.iter().cloned());
    lines.extend(party.email.iter().cloned());
    lines.extend(party.phone.iter().cloned());
    lines.retain(|l| !l.trim().is_empty());
    lines.join("\n")
}

fn bullets(items: &[String]) -> Block<'static> {
    Block::Bullets(items.iter().map(BulletItem::plain).collect())
}

fn cover<'d>(doc: &'d ProposalDocument, theme: &ThemeConfig) -> Vec<Block<'d>> {
    let cover = &doc.cover;
    let mut blocks = Vec::new();
    if let Some(logo) = &cover.logo {
        blocks.push(Block::Image(ImageBlock {
            source: ImageSource::Named(logo.clone()),
            class: AssetClass::Decorative,
            max_width: Some(LOGO_MAX_WIDTH),
            max_height: Some(LOGO_MAX_HEIGHT),
            align: Align::Left,
        }));
    }
    blocks.push(Block::Spacer(theme.spacing.cover_top));
    blocks.push(Block::paragraph(&cover.title, TextRole::PageTitle));
    if let Some(subtitle) = &cover.subtitle {
        blocks.push(Block::paragraph(subtitle, TextRole::Subtitle));
    }
    blocks.push(Block::Spacer(theme.spacing.after_title));
    blocks.push(Block::Rule);

    blocks.push(Block::SubHeading("Prepared for".into()));
    blocks.push(Block::paragraph(party_lines(&cover.client), TextRole::Body));
    blocks.push(Block::SubHeading("Prepared by".into()));
    blocks.push(Block::paragraph(party_lines(&cover.sender), TextRole::Body));

    blocks.push(Block::Spacer(theme.spacing.after_title));
    blocks.push(Block::key_value("Proposal Number", &cover.proposal_number));
    blocks.push(Block::key_value("Date", format_date(cover.date)));
    if let Some(valid_until) = cover.valid_until {
        blocks.push(Block::key_value("Valid Until", format_date(valid_until)));
    }
    blocks
}

/// About, Capabilities and Difference: caller text or built-in copy.
fn custom(doc: &ProposalDocument, kind: CustomSectionKind) -> Vec<Block<'static>> {
    let section = doc.custom_section(kind);
    let title = section
        .and_then(|s| s.title.clone())
        .unwrap_or_else(|| kind.default_title().to_string());
    let body = match section.map(|s| &s.body) {
        Some(SectionBody::Text(text)) if !text.trim().is_empty() => text.as_str(),
        _ => boilerplate::default_text(kind),
    };

    let mut blocks = vec![Block::Heading(title)];
    blocks.extend(text_blocks(body, TextRole::Body));
    for name in section.map(|s| s.images.as_slice()).unwrap_or_default() {
        blocks.push(Block::Image(ImageBlock {
            source: ImageSource::Named(name.clone()),
            class: AssetClass::Decorative,
            max_width: None,
            max_height: Some(ILLUSTRATION_MAX_HEIGHT),
            align: Align::Center,
        }));
    }
    blocks
}

fn project(doc: &ProposalDocument) -> Vec<Block<'static>> {
    let project = &doc.project;
    let mut blocks = vec![Block::Heading("Project Details".into())];
    if !project.name.is_empty() {
        blocks.push(Block::key_value("Project", &project.name));
    }
    if let Some(location) = &project.location {
        blocks.push(Block::key_value("Location", location));
    }
    if let Some(start) = project.start_date {
        blocks.push(Block::key_value("Start Date", format_date(start)));
    }
    if let Some(duration) = &project.duration {
        blocks.push(Block::key_value("Duration", duration));
    }

    if !project.overview.trim().is_empty() {
        blocks.push(Block::SubHeading("Overview".into()));
        blocks.extend(text_blocks(&project.overview, TextRole::Body));
    }
    if !project.scope.is_empty() {
        blocks.push(Block::SubHeading("Scope of Work".into()));
        blocks.push(bullets(&project.scope));
    }
    if !project.deliverables.is_empty() {
        blocks.push(Block::SubHeading("Deliverables".into()));
        blocks.push(bullets(&project.deliverables));
    }
    if !project.references.is_empty() {
        blocks.push(Block::SubHeading("References".into()));
        blocks.push(Block::Bullets(
            project
                .references
                .iter()
                .map(|r| BulletItem {
                    text: r.text.clone(),
                    level: 0,
                    link: Some(r.link.clone()),
                })
                .collect(),
        ));
    }
    blocks
}

fn estimate(doc: &ProposalDocument) -> Vec<Block<'static>> {
    let estimate = &doc.estimate;
    let mut blocks = vec![Block::Heading("Estimate".into())];

    if estimate.line_items.is_empty() {
        blocks.push(Block::paragraph("No line items.", TextRole::Body));
    } else {
        let rows = estimate
            .line_items
            .iter()
            .map(|item| {
                vec![
                    Cell::Item {
                        name: item.name.clone(),
                        description: parse_text_blocks(&item.description),
                    },
                    Cell::Text(format_quantity(item.quantity)),
                    Cell::Text(format_currency(item.rate)),
                    Cell::Text(format_currency(item.amount)),
                ]
            })
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                ColumnSpec::new("Item", ColumnWidth::Flex, Align::Left),
                ColumnSpec::new("Qty", ColumnWidth::Fixed(48.0), Align::Right),
                ColumnSpec::new("Rate", ColumnWidth::Fixed(80.0), Align::Right),
                ColumnSpec::new("Amount", ColumnWidth::Fixed(90.0), Align::Right),
            ],
            rows,
        }));
    }

    let total_line = |label: &str, value, emphasis| TotalLine {
        label: label.to_string(),
        value: format_currency(value),
        emphasis,
    };
    let mut totals = vec![total_line("Subtotal", estimate.subtotal, false)];
    if let Some(discount) = estimate.discount {
        totals.push(total_line("Discount", discount, false));
    }
    if let Some(tax) = estimate.tax {
        totals.push(total_line("Tax", tax, false));
    }
    totals.push(total_line("Total", estimate.total, true));
    blocks.push(Block::Totals(totals));

    if let Some(notes) = estimate.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        blocks.push(Block::SubHeading("Notes".into()));
        blocks.extend(text_blocks(notes, TextRole::Body));
    }
    blocks
}

fn payment(doc: &ProposalDocument) -> Vec<Block<'_>> {
    let payment = &doc.payment;
    let mut blocks = vec![Block::Heading("Payment Terms".into())];

    if !payment.schedule.is_empty() {
        blocks.push(Block::SubHeading("Payment Schedule".into()));
        let rows = payment
            .schedule
            .iter()
            .map(|m| {
                vec![
                    Cell::Text(m.label.clone()),
                    Cell::Text(m.percent.map(format_percent).unwrap_or_default()),
                    Cell::Text(m.due.clone().unwrap_or_default()),
                    Cell::Text(format_currency(m.amount)),
                ]
            })
            .collect();
        blocks.push(Block::Table(Table {
            columns: vec![
                ColumnSpec::new("Milestone", ColumnWidth::Flex, Align::Left),
                ColumnSpec::new("Percent", ColumnWidth::Fixed(60.0), Align::Right),
                ColumnSpec::new("Due", ColumnWidth::Fixed(120.0), Align::Left),
                ColumnSpec::new("Amount", ColumnWidth::Fixed(90.0), Align::Right),
            ],
            rows,
        }));
    }
    if !payment.accepted_methods.is_empty() {
        blocks.push(Block::SubHeading("Accepted Payment Methods".into()));
        blocks.push(bullets(&payment.accepted_methods));
    }
    if !payment.terms.trim().is_empty() {
        blocks.push(Block::SubHeading("Terms".into()));
        blocks.extend(text_blocks(&payment.terms, TextRole::Body));
    }

    let sender = &doc.cover.sender;
    blocks.push(Block::SubHeading("Acceptance".into()));
    blocks.push(Block::paragraph(
        "By signing below, both parties agree to the scope, pricing and terms described in this proposal.",
        TextRole::Body,
    ));
    blocks.push(Block::Signatures([
        SignatureColumn {
            heading: format!("Client: {}", doc.cover.client.company.as_deref().unwrap_or(&doc.cover.client.name)),
            key: "client",
            record: doc.client_signature.as_ref(),
        },
        SignatureColumn {
            heading: format!("Sender: {}", sender.company.as_deref().unwrap_or(&sender.name)),
            key: "sender",
            record: doc.sender_signature.as_ref(),
        },
    ]));
    blocks
}

/// One page per usable image. Unusable images are dropped here so they do
/// not leave blank pages behind.
fn standards(doc: &ProposalDocument, assets: &mut AssetResolver) -> Vec<Block<'static>> {
    let Some(section) = doc.custom_section(CustomSectionKind::Standards) else {
        return Vec::new();
    };
    let mut blocks = Vec::new();
    for name in &section.images {
        if let Err(e) = assets.resolve_named(name) {
            log::warn!("Skipping standards page: {e}");
            continue;
        }
        if !blocks.is_empty() {
            blocks.push(Block::PageBreak);
        }
        blocks.push(Block::Image(ImageBlock {
            source: ImageSource::Named(name.clone()),
            class: AssetClass::Decorative,
            max_width: None,
            max_height: None,
            align: Align::Center,
        }));
    }
    blocks
}

fn party_audit_blocks(
    blocks: &mut Vec<Block<'_>>,
    heading: &str,
    record: Option<&SignatureRecord>,
    times: Option<&PartyTimestamps>,
    ip: Option<&str>,
) {
    blocks.push(Block::SubHeading(heading.to_string()));
    let name = record.map(|r| r.signer_name.as_str()).unwrap_or(NOT_RECORDED);
    blocks.push(Block::key_value("Name", name));
    if let Some(title) = record.and_then(|r| r.signer_title.as_deref()) {
        blocks.push(Block::key_value("Title", title));
    }
    let email = record
        .map(|r| r.signer_email.as_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(NOT_RECORDED);
    blocks.push(Block::key_value("Email", email));
    blocks.push(Block::key_value("Sent", format_timestamp(times.and_then(|t| t.sent))));
    blocks.push(Block::key_value("Viewed", format_timestamp(times.and_then(|t| t.viewed))));
    let signed = times
        .and_then(|t| t.signed)
        .or_else(|| record.and_then(|r| r.signed_at_utc));
    blocks.push(Block::key_value("Signed", format_timestamp(signed)));
    blocks.push(Block::key_value("IP Address", ip.unwrap_or(NOT_RECORDED)));
}

fn certificate(doc: &ProposalDocument) -> Vec<Block<'static>> {
    let audit: Option<&AuditTrail> = doc.audit_trail.as_ref();
    let mut blocks = vec![Block::Heading("Certificate of Signature".into())];
    let reference = audit
        .map(|a| a.certificate_ref_number.as_str())
        .filter(|r| !r.is_empty())
        .unwrap_or(NOT_RECORDED);
    blocks.push(Block::key_value("Reference Number", reference));
    blocks.push(Block::key_value(
        "Document",
        format!("Proposal {}: {}", doc.cover.proposal_number, doc.cover.title),
    ));

    party_audit_blocks(
        &mut blocks,
        "Client",
        doc.client_signature.as_ref(),
        audit.map(|a| &a.client_timestamps),
        audit.and_then(|a| a.client_ip.as_deref()),
    );
    let location = audit.and_then(|a| a.client_location.as_deref());
    blocks.push(Block::key_value("Location", location.unwrap_or(NOT_RECORDED)));
    party_audit_blocks(
        &mut blocks,
        "Sender",
        doc.sender_signature.as_ref(),
        audit.map(|a| &a.sender_timestamps),
        audit.and_then(|a| a.sender_ip.as_deref()),
    );

    blocks.push(Block::Rule);
    blocks.push(Block::paragraph(
        "This certificate records the signing events captured for this proposal. All times are UTC.",
        TextRole::Caption,
    ));
    blocks
}
