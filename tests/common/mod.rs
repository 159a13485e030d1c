#![allow(dead_code)]

use std::io::Cursor;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proposal_pdf::{
    AuditTrail, CoverSection, CustomSection, CustomSectionKind, EstimateSection, Hyperlink,
    ImageAsset, Layout, LineItem, LinkedItem, Party, PartyTimestamps, PaymentMilestone,
    PaymentSection, PlacementKind, ProjectSection, ProposalDocument, SectionBody, SignatureRecord,
};
use rust_decimal::Decimal;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Solid-color PNG of the given size.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> ImageAsset {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
        .unwrap();
    ImageAsset {
        data,
        pixel_width: width,
        pixel_height: height,
    }
}

pub fn line_item(i: usize) -> LineItem {
    LineItem {
        name: format!("Phase {} site work", i + 1),
        description: "Crew time and materials for this phase.\n• Mobilization\n• Daily cleanup"
            .to_string(),
        quantity: dec(2, 0),
        rate: dec(61725, 2),
        amount: dec(12345, 1),
    }
}

pub fn sample_document(items: usize) -> ProposalDocument {
    let line_items: Vec<LineItem> = (0..items).map(line_item).collect();
    let subtotal = line_items.iter().map(|i| i.amount).sum::<Decimal>();
    ProposalDocument {
        cover: CoverSection {
            title: "Office Renovation Proposal".into(),
            subtitle: Some("Second floor build-out".into()),
            client: Party {
                name: "Dana Whitfield".into(),
                company: Some("Harbor Dental Group".into()),
                email: Some("dana@harbordental.example".into()),
                phone: None,
                address_lines: vec!["120 Pier Street".into(), "Portland, ME 04101".into()],
            },
            sender: Party {
                name: "Sam Ortega".into(),
                company: Some("Northline Builders".into()),
                email: Some("sam@northline.example".into()),
                phone: Some("(207) 555-0134".into()),
                address_lines: vec![],
            },
            proposal_number: "P-2041".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2026, 3, 31),
            logo: None,
        },
        project: ProjectSection {
            name: "Harbor Dental second floor".into(),
            location: Some("120 Pier Street, Portland".into()),
            start_date: NaiveDate::from_ymd_opt(2026, 4, 6),
            duration: Some("10 weeks".into()),
            overview: "Convert the open second floor into four operatories.\nKey constraints:\n• Clinic stays open\n  - Work after 6pm on weekdays".into(),
            scope: vec!["Demolition of existing partitions".into(), "New plumbing rough-in".into()],
            deliverables: vec!["As-built drawings".into()],
            references: vec![LinkedItem {
                text: "Permit status".into(),
                link: Hyperlink {
                    label: "permits.example.com".into(),
                    url: "https://permits.example.com/p-2041".into(),
                },
            }],
        },
        estimate: EstimateSection {
            line_items,
            subtotal,
            discount: None,
            tax: Some(dec(0, 0)),
            total: subtotal,
            notes: Some("Prices hold for 30 days.".into()),
        },
        payment: PaymentSection {
            schedule: vec![
                PaymentMilestone {
                    label: "Deposit".into(),
                    percent: Some(dec(30, 0)),
                    amount: dec(370, 0),
                    due: Some("On signing".into()),
                },
                PaymentMilestone {
                    label: "Completion".into(),
                    percent: Some(dec(70, 0)),
                    amount: dec(8645, 1),
                    due: Some("On handover".into()),
                },
            ],
            accepted_methods: vec!["ACH transfer".into(), "Check".into()],
            terms: "Invoices are due within 15 days.".into(),
        },
        custom_sections: vec![CustomSection {
            kind: CustomSectionKind::About,
            title: None,
            body: SectionBody::Boilerplate,
            images: vec![],
        }],
        client_signature: None,
        sender_signature: None,
        audit_trail: None,
    }
}

pub fn signature(name: &str, email: &str, signed_at: Option<DateTime<Utc>>) -> SignatureRecord {
    SignatureRecord {
        image: Some(png(120, 40, [20, 20, 80, 255])),
        signer_name: name.into(),
        signer_email: email.into(),
        signer_title: None,
        signed_at_utc: signed_at,
    }
}

pub fn audit_trail() -> AuditTrail {
    AuditTrail {
        certificate_ref_number: "CERT-7F3A-2041".into(),
        sender_timestamps: PartyTimestamps {
            sent: Some(utc(2026, 3, 1, 9, 0, 0)),
            viewed: Some(utc(2026, 3, 1, 9, 0, 5)),
            signed: Some(utc(2026, 3, 1, 9, 1, 0)),
        },
        sender_ip: Some("198.51.100.7".into()),
        client_timestamps: PartyTimestamps {
            sent: Some(utc(2026, 3, 1, 9, 1, 30)),
            viewed: Some(utc(2026, 3, 2, 14, 2, 11)),
            signed: Some(utc(2026, 3, 2, 14, 5, 9)),
        },
        client_ip: Some("203.0.113.42".into()),
        client_location: Some("Portland, ME".into()),
    }
}

pub fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("output parses as PDF")
        .get_pages()
        .len()
}

/// Number of image XObjects written to the file.
pub fn pdf_image_count(bytes: &[u8]) -> usize {
    let doc = lopdf::Document::load_mem(bytes).expect("output parses as PDF");
    doc.objects
        .values()
        .filter(|obj| match obj {
            lopdf::Object::Stream(stream) => {
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .is_ok_and(|n| n == b"Image");
                let is_mask = stream
                    .dict
                    .get(b"ColorSpace")
                    .and_then(|s| s.as_name())
                    .is_ok_and(|n| n == b"DeviceGray");
                is_image && !is_mask
            }
            _ => false,
        })
        .count()
}

pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// `(page, row index)` for every estimate table row. The estimate ends where
/// the payment section starts.
pub fn estimate_rows(layout: &Layout) -> Vec<(usize, usize)> {
    let payment_page = layout.pages_containing("Payment Terms")[0];
    let mut rows = Vec::new();
    for (page_index, page) in layout.pages.iter().enumerate().take(payment_page) {
        for p in &page.placements {
            if let PlacementKind::TableRow { index, .. } = p.kind {
                rows.push((page_index, index));
            }
        }
    }
    rows
}
