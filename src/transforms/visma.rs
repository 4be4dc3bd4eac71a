use crate::constants;
use crate::error::{Result, TransformError};
use crate::sanitizer::{self, Sanitizer};
use crate::schema::{ContactPoint, JobPosting, Organization, PostalAddress};
use crate::types::{DataReader, DataTransform, RawPayload};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use metrics::counter;
use regex::Regex;
use roxmltree::{Document, Node};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const PARAGRAPH_MARKER: &str = "[[paragraph]]";

/// Localized text block of one assignment, taken from its first
/// `AssignmentLoc` node.
#[derive(Debug, Clone, Default)]
struct AssignmentLoc {
    title: String,
    work_descr: String,
    start_date_descr: String,
    experience: String,
    employment_grade: String,
    employment_type: String,
    county: String,
    municipality: String,
    country: String,
    owner_department: String,
}

/// One vacancy as represented in the summary feed. Lives only for the
/// duration of a single transform pass.
#[derive(Debug, Clone)]
struct FeedAssignment {
    guid: String,
    ref_no: String,
    number_of_jobs: String,
    account_name: String,
    publish_start_date: String,
    application_end_date: String,
    loc: AssignmentLoc,
}

/// Resolved organization name candidates. Both fields normalize to empty
/// strings, so downstream assembly never branches on presence.
#[derive(Debug, Clone)]
struct OrganizationNames {
    organization: String,
    unit: String,
}

/// Fields only available from the per-assignment detail fetch: the summary
/// feed omits full description sections and contact data.
#[derive(Debug, Clone, Default)]
struct AssignmentDetail {
    direct_apply_url: String,
    department_descr: String,
    work_descr: String,
    qualifications: String,
    additional_info: String,
    contacts: Vec<ContactPoint>,
}

/// Transforms a Visma recruitment feed into canonical job postings.
///
/// The summary feed lists assignments; each emitted record additionally
/// requires a detail fetch against the assignment-item endpoint. Detail
/// fetches run on a bounded stream and results keep feed order.
pub struct VismaJobPostingTransform {
    sanitizers: Vec<Box<dyn Sanitizer>>,
    guid_group: String,
    item_url: String,
    fetcher: Arc<dyn DataReader>,
    concurrency: usize,
}

impl VismaJobPostingTransform {
    pub fn new(
        sanitizers: Vec<Box<dyn Sanitizer>>,
        guid_group: impl Into<String>,
        fetcher: Arc<dyn DataReader>,
    ) -> Self {
        Self {
            sanitizers,
            guid_group: guid_group.into(),
            item_url: constants::ASSIGNMENT_ITEM_URL.to_string(),
            fetcher,
            concurrency: constants::DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_item_url(mut self, item_url: impl Into<String>) -> Self {
        self.item_url = item_url.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs the fallible part of the per-record pipeline. Any error here is
    /// caught by the caller and drops only this record.
    async fn build_posting(&self, assignment: FeedAssignment) -> Result<JobPosting> {
        let names = resolve_organization_names(&assignment);
        let detail = self.fetch_detail(&assignment.guid).await?;

        let description = format_description(&detail);
        let link = sanitizer::apply_chain(&self.sanitizers, &detail.direct_apply_url);

        let employment_unit = if names.unit.is_empty() {
            None
        } else {
            Some(Organization {
                name: names.unit.clone(),
                address: PostalAddress::from_source(
                    &assignment.loc.county,
                    &assignment.loc.municipality,
                    &assignment.loc.country,
                ),
            })
        };

        let hiring_organization = if names.organization.is_empty() {
            None
        } else {
            Some(Organization {
                name: names.organization.clone(),
                address: None,
            })
        };

        let mut posting = JobPosting {
            identifier: assignment.ref_no,
            total_job_openings: assignment.number_of_jobs,
            title: assignment.loc.title,
            description,
            job_start_date: assignment.loc.start_date_descr,
            responsibilities: assignment.loc.work_descr,
            date_posted: format_date(&assignment.publish_start_date),
            experience_requirements: assignment.loc.experience,
            employment_type: assignment.loc.employment_grade,
            work_hours: assignment.loc.employment_type,
            valid_through: format_date(&assignment.application_end_date),
            url: link.clone(),
            direct_apply: link,
            hiring_organization,
            employment_unit,
            application_contact: detail.contacts,
            version: None,
        };
        posting.fingerprint()?;
        Ok(posting)
    }

    /// Fetches and parses the per-assignment detail document. Every failure
    /// mode here (transport, bad status, missing content, parse error) maps
    /// to a record-local `Fetch` error.
    async fn fetch_detail(&self, guid: &str) -> Result<AssignmentDetail> {
        let url = format!(
            "{}?guidGroup={}&guidAssignment={}",
            self.item_url, self.guid_group, guid
        );

        let fetch_err = |message: String| TransformError::Fetch {
            guid: guid.to_string(),
            message,
        };

        let payload = self
            .fetcher
            .read(&url)
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let content = payload
            .content()
            .ok_or_else(|| fetch_err("detail response carried no content".to_string()))?;

        let clean_xml = sanitizer::clean(content);
        let document =
            Document::parse(&clean_xml).map_err(|e| fetch_err(format!("detail parse: {e}")))?;
        let node = document
            .descendants()
            .find(|n| n.has_tag_name("Assignment"))
            .ok_or_else(|| fetch_err("no Assignment node in detail response".to_string()))?;

        Ok(parse_detail(node))
    }

    async fn process_assignment(&self, assignment: FeedAssignment) -> Option<JobPosting> {
        let guid = assignment.guid.clone();
        match self.build_posting(assignment).await {
            Ok(posting) => Some(posting),
            Err(TransformError::Fetch { guid, message }) => {
                warn!("Skipping assignment {}: secondary fetch failed: {}", guid, message);
                None
            }
            Err(e) => {
                error!("Skipping assignment {}: {}", guid, e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl DataTransform for VismaJobPostingTransform {
    async fn transform(&self, payload: &RawPayload) -> Result<Vec<JobPosting>> {
        let Some(content) = payload.content() else {
            warn!("{}", TransformError::EmptyPayload);
            return Ok(Vec::new());
        };

        let clean_xml = sanitizer::clean(content);

        if clean_xml.contains(constants::GROUP_NOT_FOUND_MARKER) {
            error!("Upstream reported an unknown group; aborting batch");
            return Err(TransformError::InvalidGroup(self.guid_group.clone()));
        }

        // Parse and extract owned assignments before any await so the
        // document never crosses a suspension point.
        let (node_count, assignments) = {
            let document = match Document::parse(&clean_xml) {
                Ok(d) => d,
                Err(e) => {
                    error!("XML parse error: {}", e);
                    return Ok(Vec::new());
                }
            };
            let nodes: Vec<Node> = document
                .descendants()
                .filter(|n| n.has_tag_name("Assignment"))
                .collect();
            let node_count = nodes.len();
            let assignments: Vec<FeedAssignment> =
                nodes.into_iter().filter_map(parse_assignment).collect();
            (node_count, assignments)
        };

        let skipped_validation = node_count - assignments.len();
        debug!(
            "Parsed {} assignments from feed ({} skipped in validation)",
            assignments.len(),
            skipped_validation
        );

        let results: Vec<Option<JobPosting>> = stream::iter(assignments)
            .map(|assignment| self.process_assignment(assignment))
            .buffered(self.concurrency)
            .collect()
            .await;

        let attempted = results.len();
        let output: Vec<JobPosting> = results.into_iter().flatten().collect();
        let dropped = attempted - output.len();

        counter!("transformer_records_emitted_total").increment(output.len() as u64);
        counter!("transformer_records_skipped_total")
            .increment((skipped_validation + dropped) as u64);

        info!("Total job postings processed: {}", output.len());
        Ok(output)
    }
}

/// First child element with the given tag name.
fn child_element<'a, 'd>(node: Node<'a, 'd>, name: &str) -> Option<Node<'a, 'd>> {
    node.children().find(|c| c.has_tag_name(name))
}

/// Walks a chain of child element names.
fn descend<'a, 'd>(node: Node<'a, 'd>, path: &[&str]) -> Option<Node<'a, 'd>> {
    let mut current = node;
    for name in path {
        current = child_element(current, name)?;
    }
    Some(current)
}

fn node_text(node: Node) -> String {
    node.text().unwrap_or("").trim().to_string()
}

fn path_text(node: Node, path: &[&str]) -> String {
    descend(node, path).map(node_text).unwrap_or_default()
}

/// Parses one summary `Assignment` node. Returns `None` when the node lacks
/// a guid or a localized detail block; those records are never emitted.
fn parse_assignment(node: Node) -> Option<FeedAssignment> {
    let Some(loc_node) = descend(node, &["Localization", "AssignmentLoc"]) else {
        debug!("Assignment without localization block, skipping");
        return None;
    };

    let guid = path_text(node, &["Guid"]);
    if guid.is_empty() {
        debug!("Assignment without guid, skipping");
        return None;
    }

    let owner_department = descend(loc_node, &["Departments"])
        .into_iter()
        .flat_map(|d| d.children())
        .filter(|c| c.has_tag_name("Department"))
        .find(|c| c.attribute("Type") == Some("Owner"))
        .map(|c| path_text(c, &["Name"]))
        .unwrap_or_default();

    let loc = AssignmentLoc {
        title: path_text(loc_node, &["AssignmentTitle"]),
        work_descr: path_text(loc_node, &["WorkDescr"]),
        start_date_descr: path_text(loc_node, &["EmploymentStartDateDescr"]),
        experience: path_text(loc_node, &["WorkExperiencePrerequisite", "Name"]),
        employment_grade: path_text(loc_node, &["EmploymentGrade", "Name"]),
        employment_type: path_text(loc_node, &["EmploymentType", "Name"]),
        county: path_text(loc_node, &["County", "Name"]),
        municipality: path_text(loc_node, &["Municipality", "Name"]),
        country: path_text(loc_node, &["Country", "Name"]),
        owner_department,
    };

    Some(FeedAssignment {
        guid,
        ref_no: path_text(node, &["RefNo"]),
        number_of_jobs: path_text(node, &["NumberOfJobs"]),
        account_name: path_text(node, &["AccountName"]),
        publish_start_date: path_text(node, &["PublishStartDate"]),
        application_end_date: path_text(node, &["ApplicationEndDate"]),
        loc,
    })
}

/// Parses a detail `Assignment` node fetched per record.
fn parse_detail(node: Node) -> AssignmentDetail {
    let loc_node = descend(node, &["Localization", "AssignmentLoc"]);

    let contacts = loc_node
        .and_then(|l| child_element(l, "ContactPersons"))
        .into_iter()
        .flat_map(|c| c.children())
        .filter(|c| c.has_tag_name("ContactPerson"))
        .map(|contact| ContactPoint {
            contact_type: path_text(contact, &["Title"]),
            name: path_text(contact, &["ContactName"]),
            email: path_text(contact, &["Email"]),
            telephone: path_text(contact, &["Telephone"]),
        })
        .collect();

    let loc_text = |name: &str| {
        loc_node
            .map(|l| path_text(l, &[name]))
            .unwrap_or_default()
    };

    AssignmentDetail {
        direct_apply_url: path_text(
            node,
            &["ApplicationMethods", "ApplicationMethod", "ValueXml", "web", "url"],
        ),
        department_descr: loc_text("DepartmentDescr"),
        work_descr: loc_text("WorkDescr"),
        qualifications: loc_text("Qualifications"),
        additional_info: loc_text("AdditionalInfo"),
        contacts,
    }
}

/// Candidate organization names in priority order: the account name, then
/// the Owner-typed department. Missing values normalize to empty strings,
/// replacing the upstream convention of a padded two-slot array.
fn resolve_organization_names(assignment: &FeedAssignment) -> OrganizationNames {
    OrganizationNames {
        organization: assignment.account_name.clone(),
        unit: assignment.loc.owner_department.clone(),
    }
}

/// Concatenates the four labeled description sections and reflows line
/// breaks into paragraph markup.
fn format_description(detail: &AssignmentDetail) -> String {
    let mut full = String::new();
    full.push_str("<h2>Om arbetsplatsen</h2>");
    full.push_str(&detail.department_descr);
    full.push_str("<h2>Arbetsuppgifter</h2>");
    full.push_str(&detail.work_descr);
    full.push_str("<h2>Kvalifikationer</h2>");
    full.push_str(&detail.qualifications);
    full.push_str("<h2>Övrig information</h2>");
    full.push_str(&detail.additional_info);
    format_text(&full)
}

/// Reflows free-form text: any run of two or more line breaks (in any of
/// `\n`, `\r\n`, `\r`, mixed) is a paragraph boundary, remaining single
/// breaks become inline `<br />`, and each segment is wrapped in `<p>`.
fn format_text(text: &str) -> String {
    let paragraph_break =
        Regex::new(r"(?:\r\n|\r|\n){2,}").expect("paragraph-break pattern is constant");
    let line_break = Regex::new(r"\r\n|\r|\n").expect("line-break pattern is constant");

    let marked = paragraph_break.replace_all(text, PARAGRAPH_MARKER);
    let with_breaks = line_break.replace_all(&marked, "<br />");

    with_breaks
        .split(PARAGRAPH_MARKER)
        .map(|para| format!("<p>{}</p>", para.trim()))
        .collect()
}

/// Best-effort normalization of a free-form source date to `YYYY-MM-DD`.
/// An unparseable date degrades this field to empty, never the record.
fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.format("%Y-%m-%d").to_string();
        }
    }

    debug!("Could not parse date {:?}, degrading field to empty", raw);
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_handles_common_shapes() {
        assert_eq!(format_date("2024-05-01"), "2024-05-01");
        assert_eq!(format_date("2024-05-01 08:30:00"), "2024-05-01");
        assert_eq!(format_date("2024-05-01T08:30:00"), "2024-05-01");
        assert_eq!(format_date("2024-05-01T08:30:00+02:00"), "2024-05-01");
        assert_eq!(format_date("01/05/2024"), "2024-05-01");
        assert_eq!(format_date("01.05.2024"), "2024-05-01");
    }

    #[test]
    fn format_date_degrades_to_empty() {
        assert_eq!(format_date("tillsvidare"), "");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn format_text_wraps_paragraphs() {
        assert_eq!(
            format_text("first\n\nsecond"),
            "<p>first</p><p>second</p>"
        );
    }

    #[test]
    fn format_text_converts_single_breaks_inline() {
        assert_eq!(format_text("a\nb"), "<p>a<br />b</p>");
    }

    #[test]
    fn format_text_treats_mixed_break_runs_as_one_boundary() {
        assert_eq!(
            format_text("a\r\n\nb\r\rc"),
            "<p>a</p><p>b</p><p>c</p>"
        );
    }

    #[test]
    fn parse_assignment_requires_guid_and_localization() {
        let xml = r#"
            <Assignments>
                <Assignment>
                    <Guid>G1</Guid>
                    <Localization><AssignmentLoc><AssignmentTitle>Ok</AssignmentTitle></AssignmentLoc></Localization>
                </Assignment>
                <Assignment>
                    <Localization><AssignmentLoc/></Localization>
                </Assignment>
                <Assignment>
                    <Guid>G3</Guid>
                </Assignment>
            </Assignments>"#;
        let doc = Document::parse(xml).unwrap();
        let parsed: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("Assignment"))
            .filter_map(parse_assignment)
            .collect();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].guid, "G1");
    }

    #[test]
    fn parse_assignment_finds_owner_department() {
        let xml = r#"
            <Assignment>
                <Guid>G1</Guid>
                <AccountName>Acme</AccountName>
                <Localization>
                    <AssignmentLoc>
                        <Departments>
                            <Department Type="Recruiting"><Name>HR</Name></Department>
                            <Department Type="Owner"><Name>Care Unit North</Name></Department>
                        </Departments>
                    </AssignmentLoc>
                </Localization>
            </Assignment>"#;
        let doc = Document::parse(xml).unwrap();
        let node = doc
            .descendants()
            .find(|n| n.has_tag_name("Assignment"))
            .unwrap();
        let assignment = parse_assignment(node).unwrap();
        assert_eq!(assignment.loc.owner_department, "Care Unit North");
        let names = resolve_organization_names(&assignment);
        assert_eq!(names.organization, "Acme");
        assert_eq!(names.unit, "Care Unit North");
    }

    #[test]
    fn parse_detail_collects_contacts_verbatim() {
        let xml = r#"
            <Assignment>
                <ApplicationMethods>
                    <ApplicationMethod>
                        <ValueXml><web><url>https://example.com/apply?id=1</url></web></ValueXml>
                    </ApplicationMethod>
                </ApplicationMethods>
                <Localization>
                    <AssignmentLoc>
                        <ContactPersons>
                            <ContactPerson>
                                <Title>Unit manager</Title>
                                <ContactName>Eva Berg</ContactName>
                                <Telephone>+46 70 123 45 67</Telephone>
                            </ContactPerson>
                        </ContactPersons>
                    </AssignmentLoc>
                </Localization>
            </Assignment>"#;
        let doc = Document::parse(xml).unwrap();
        let node = doc
            .descendants()
            .find(|n| n.has_tag_name("Assignment"))
            .unwrap();
        let detail = parse_detail(node);
        assert_eq!(detail.direct_apply_url, "https://example.com/apply?id=1");
        assert_eq!(detail.contacts.len(), 1);
        assert_eq!(detail.contacts[0].contact_type, "Unit manager");
        assert_eq!(detail.contacts[0].name, "Eva Berg");
        assert_eq!(detail.contacts[0].email, "");
        assert_eq!(detail.contacts[0].telephone, "+46 70 123 45 67");
    }
}
