use crate::model::CustomSectionKind;

const ABOUT: &str = "\
We are an independent team of project managers, surveyors and field technicians \
delivering measured, documented results for commercial and residential clients.
Every engagement is staffed by people who have done the work before and who stay \
with the project from kickoff through final handover.
What our clients can expect:
• A single point of contact for the life of the project
• Written updates at every milestone
• Clear pricing with no surprise change orders";

const CAPABILITIES: &str = "\
Our in-house capabilities cover the full project lifecycle:
• Site assessment and existing-conditions documentation
• Planning, scheduling and permit coordination
• Field execution with certified crews
  - Safety-first procedures on every site
  - Daily quality checks against the agreed scope
• Closeout documentation and warranty support";

const DIFFERENCE: &str = "\
Proposals are easy to write. Delivering on them is harder.
We measure ourselves on schedule adherence, budget accuracy and the number of \
clients who hire us again. Those numbers are available on request, and we are \
happy to put you in touch with recent clients for references.";

pub(crate) fn default_text(kind: CustomSectionKind) -> &'static str {
    match kind {
        CustomSectionKind::About => ABOUT,
        CustomSectionKind::Capabilities => CAPABILITIES,
        CustomSectionKind::Difference => DIFFERENCE,
        CustomSectionKind::Standards => "",
    }
}
