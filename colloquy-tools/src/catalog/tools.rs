use super::{Catalog, Work, WorkCategory, WorkPart, WorkSummary};
use crate::reply::ToolReply;
use crate::schema::{FieldSpec, InputSchema};
use crate::tool::{Tool, ToolId, ToolSpec};
use async_trait::async_trait;
use colloquy_core::{FeaturedParts, OutputSegment, ToolError};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_LIST_LIMIT: usize = 5;
const MAX_SUGGESTIONS: usize = 3;

// ============================================================================
// LIST WORKS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CategoryFilter {
    #[default]
    All,
    Poem,
    ShortStories,
    Essay,
    NonFiction,
}

impl CategoryFilter {
    fn category(self) -> Option<WorkCategory> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Poem => Some(WorkCategory::Poem),
            CategoryFilter::ShortStories => Some(WorkCategory::ShortStories),
            CategoryFilter::Essay => Some(WorkCategory::Essay),
            CategoryFilter::NonFiction => Some(WorkCategory::NonFiction),
        }
    }

    fn label(self) -> &'static str {
        self.category().map_or("all", |c| c.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListWorksInput {
    #[serde(default)]
    category: Option<CategoryFilter>,
    #[serde(default)]
    random: Option<bool>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksListing {
    pub works: Vec<WorkSummary>,
    pub count: usize,
    pub category: String,
    pub randomized: bool,
}

/// Lists works in the catalog, optionally a random sample.
pub struct ListWorksTool {
    catalog: Arc<dyn Catalog>,
}

impl ListWorksTool {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ListWorksTool {
    type Input = ListWorksInput;
    type Output = ToolReply<WorksListing>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::ListWorks,
            description: "Lists creative works by Tagore such as poems, short stories, essays, and non-fiction.",
            input_schema: InputSchema::new()
                .field(
                    "category",
                    FieldSpec::string("Category of works to list ('poem', 'short-stories', 'essay', 'non-fiction', or 'all')")
                        .one_of(&["poem", "short-stories", "essay", "non-fiction", "all"]),
                )
                .field(
                    "random",
                    FieldSpec::boolean("Whether to return random works or all works")
                        .default_value(json!(false)),
                )
                .field(
                    "limit",
                    FieldSpec::integer("Maximum number of works to return (for random selection)")
                        .default_value(json!(DEFAULT_LIST_LIMIT)),
                ),
        }
    }

    async fn invoke(&self, input: ListWorksInput) -> Result<Self::Output, ToolError> {
        let filter = input.category.unwrap_or_default();
        let randomized = input.random.unwrap_or(false);
        let mut works = self.catalog.list(filter.category());

        if randomized {
            works.shuffle(&mut rand::rng());
            works.truncate(input.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        }

        Ok(ToolReply::ok(WorksListing {
            count: works.len(),
            works,
            category: filter.label().to_string(),
            randomized,
        }))
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(format_listing, |error| {
            vec![OutputSegment::display(format!(
                "Sorry, I encountered an error while retrieving the works: {}.\n",
                error
            ))]
        })
    }
}

fn format_listing(listing: &WorksListing) -> Vec<OutputSegment> {
    let show_category = listing.category == "all";
    let Some(first) = listing.works.first() else {
        let kind = if show_category {
            "creative"
        } else {
            listing.category.as_str()
        };
        return vec![OutputSegment::speakable(format!(
            "\n\nI couldn't find any {} works in the database.\n",
            kind
        ))];
    };

    let mut segments = vec![OutputSegment::display("\n\n")];
    for (i, work) in listing.works.iter().enumerate() {
        let line = if show_category {
            format!("{}. \"{}\" ({})\n", i + 1, work.title, work.category)
        } else {
            format!("{}. \"{}\"\n", i + 1, work.title)
        };
        segments.push(OutputSegment::display(line));
    }
    segments.push(OutputSegment::speakable(format!(
        "\nYou can ask me to read any of these works by title, like \"Please read {}\" or ask me for other works.\n",
        first.title
    )));
    segments.push(OutputSegment::speakable("Or try clicking on a link above.\n"));
    segments
}

// ============================================================================
// GET WORK CONTENT
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetWorkContentInput {
    #[serde(default)]
    title: String,
    #[serde(default)]
    part_number: Option<u32>,
    #[serde(default)]
    whole_work: bool,
    #[serde(default = "default_true")]
    fuzzy_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkContent {
    #[serde(flatten)]
    pub summary: WorkSummary,
    pub parts: Vec<WorkPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkContentBody {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Retrieves a work's text by title, one part at a time unless the whole
/// work is requested.
pub struct GetWorkContentTool {
    catalog: Arc<dyn Catalog>,
    featured: FeaturedParts,
}

impl GetWorkContentTool {
    pub fn new(catalog: Arc<dyn Catalog>, featured: FeaturedParts) -> Self {
        Self { catalog, featured }
    }

    fn find(&self, input: &GetWorkContentInput) -> Option<Work> {
        self.catalog.find_exact(&input.title).or_else(|| {
            if input.fuzzy_match {
                self.catalog.find_fuzzy(&input.title)
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl Tool for GetWorkContentTool {
    type Input = GetWorkContentInput;
    type Output = ToolReply<WorkContentBody>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::GetWorkContent,
            description: "Retrieves the content of a specific creative work by title.",
            input_schema: InputSchema::new()
                .field(
                    "title",
                    FieldSpec::string("Title of the work to retrieve content for").required(),
                )
                .field(
                    "part_number",
                    FieldSpec::integer("Specific part number to retrieve (if not specified, defaults to first part unless whole_work is true)")
                        .nullable(),
                )
                .field(
                    "whole_work",
                    FieldSpec::boolean("Whether to retrieve the entire work with all parts. Set whole_work to true only if the user specifically requests for the whole content, otherwise set to false.")
                        .default_value(json!(false)),
                )
                .field(
                    "fuzzy_match",
                    FieldSpec::boolean("Whether to perform fuzzy matching on the title")
                        .default_value(json!(true)),
                ),
        }
    }

    async fn invoke(&self, input: GetWorkContentInput) -> Result<Self::Output, ToolError> {
        if input.title.trim().is_empty() {
            return Ok(ToolReply::failure("Title is required"));
        }

        let Some(work) = self.find(&input) else {
            let suggestions = if input.fuzzy_match {
                self.catalog.suggest(&input.title, MAX_SUGGESTIONS)
            } else {
                Vec::new()
            };
            return Ok(ToolReply::ok(WorkContentBody {
                found: false,
                work: None,
                message: Some(format!("No work found with title '{}'", input.title)),
                suggestions: Some(suggestions),
            }));
        };

        let featured = match (input.part_number, input.whole_work) {
            (None, false) => self.featured.lookup(&input.title),
            _ => None,
        };

        let parts: Vec<WorkPart> = if let Some(number) = featured {
            work.part(number)
                .or_else(|| work.parts.first())
                .cloned()
                .into_iter()
                .collect()
        } else if let Some(number) = input.part_number {
            match work.part(number) {
                Some(part) => vec![part.clone()],
                None => {
                    return Ok(ToolReply::ok(WorkContentBody {
                        found: true,
                        work: Some(WorkContent {
                            summary: work.summary(),
                            parts: Vec::new(),
                        }),
                        message: Some(format!(
                            "Part {} not found for '{}'",
                            number, input.title
                        )),
                        suggestions: None,
                    }));
                }
            }
        } else if input.whole_work {
            work.parts.clone()
        } else {
            work.parts.first().cloned().into_iter().collect()
        };

        Ok(ToolReply::ok(WorkContentBody {
            found: true,
            work: Some(WorkContent {
                summary: work.summary(),
                parts,
            }),
            message: None,
            suggestions: None,
        }))
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(format_work_content, |error| {
            vec![OutputSegment::display(format!(
                "\n\nSorry, I encountered an error: {}\n",
                error
            ))]
        })
    }
}

fn format_work_content(body: &WorkContentBody) -> Vec<OutputSegment> {
    let work = match (&body.work, body.found) {
        (Some(work), true) => work,
        _ => {
            let message = body.message.as_deref().unwrap_or("Work not found.");
            let mut segments = vec![OutputSegment::display(format!("\n\n{}\n", message))];
            if let Some(suggestions) = body.suggestions.as_ref().filter(|s| !s.is_empty()) {
                let quoted: Vec<String> = suggestions.iter().map(|s| format!("\"{}\"", s)).collect();
                segments.push(OutputSegment::speakable(format!(
                    "You might be looking for: {}?\n",
                    quoted.join(", ")
                )));
            }
            return segments;
        }
    };

    let mut segments = vec![OutputSegment::display(format!(
        "\n\n# {}\n\n",
        work.summary.title
    ))];

    if let Some(message) = &body.message {
        segments.push(OutputSegment::display(format!("{}\n", message)));
        return segments;
    }

    match work.parts.as_slice() {
        [] => segments.push(OutputSegment::display("This work has no content available.\n")),
        [single] => segments.push(OutputSegment::speakable(format!("{}\n", single.content))),
        parts => {
            for part in parts {
                segments.push(OutputSegment::display(format!(
                    "## Part {}\n\n",
                    part.part_number
                )));
                segments.push(OutputSegment::speakable(format!("{}\n\n", part.content)));
            }
        }
    }
    segments
}
