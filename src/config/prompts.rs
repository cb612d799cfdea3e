//! Prompt templates for Ringe.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub planner: PlannerPrompts,
    pub analyzer: AnalyzerPrompts,
    pub tagging: TaggingPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompt for turning a user query into an analysis plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerPrompts {
    pub user: String,
}

impl Default for PlannerPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are an analyst for a curtain and carpet rental company's phone-call archive.

USER QUERY: "{{query}}"

YOUR TASK: produce an analysis plan. The system will use it to select tagged
call transcripts from the last few years and compute metrics over them.

AVAILABLE TAGS in the archive:
{{vocabulary}}

METRICS the system can compute:
- count_by_tag: number of calls carrying a tag over the period
- top_n_tags: most frequent tags over the period
- tag_trends: how often a tag occurs over time - is it rising or falling?
- comparison: compare two tags against each other

TODAY'S DATE: {{current_date}} - use it to resolve periods given relative to
today ("last year", "this month" and similar).

Return ONLY a JSON object describing what the system should extract: which
period the data must cover, which tags to select calls by, and which metrics
to compute for this query.
{
  "time_period": {
    "description": "period description",
    "start": "YYYY-MM-DD or null",
    "end": "YYYY-MM-DD or null"
  },
  "target_tags": ["tag1", "tag2"],
  "metrics": ["count_by_tag", "tag_trends", "top_n_tags", "comparison"],
  "grouping": "month/week/day"
}

JSON:"#
                .to_string(),
        }
    }
}

/// Prompt for turning metric results into a prose answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerPrompts {
    pub user: String,
}

impl Default for AnalyzerPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are a senior analyst at a carpet rental company.

CLIENT QUERY: "{{query}}"

To answer it, the system selected client calls for the relevant period and
computed the necessary metrics:
- Period the client asked about: {{period}}
- Tags the system selected calls by: {{tags}}
- Metrics computed over those calls: {{metrics}}

Raw metric results:
{{results}}

YOUR TASK:
1. Analyze the numbers in these results (if they are not empty!)
2. Answer the client's query
3. Call out the key insights
4. Be concrete, cite the numbers

FORMAT:
- Short conclusion
- Detailed analysis
- Recommendations (when warranted)

If the metrics came back empty, or the results are not sufficient to answer
the query, say exactly that instead of inventing numbers.

Respond in the language of the client's query."#
                .to_string(),
        }
    }
}

/// Prompt for assigning vocabulary tags to a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingPrompts {
    pub user: String,
}

impl Default for TaggingPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are labeling a phone-call transcript for a carpet rental company.

ALLOWED TAGS (use only these, verbatim):
{{vocabulary}}

TRANSCRIPT:
{{transcript}}

Pick every tag that describes why the client called. Zero tags is a valid
answer when nothing fits. Never invent tags outside the list.

Return ONLY a JSON array of tag strings, e.g. ["погашение_долга"]."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom
    /// directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let planner_path = custom_path.join("planner.toml");
            if planner_path.exists() {
                let content = std::fs::read_to_string(&planner_path)?;
                prompts.planner = toml::from_str(&content)?;
            }

            let analyzer_path = custom_path.join("analyzer.toml");
            if analyzer_path.exists() {
                let content = std::fs::read_to_string(&analyzer_path)?;
                prompts.analyzer = toml::from_str(&content)?;
            }

            let tagging_path = custom_path.join("tagging.toml");
            if tagging_path.exists() {
                let content = std::fs::read_to_string(&tagging_path)?;
                prompts.tagging = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom
    /// config variables. Provided variables take precedence.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.planner.user.contains("{{query}}"));
        assert!(prompts.analyzer.user.contains("{{results}}"));
        assert!(prompts.tagging.user.contains("{{vocabulary}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Query {{query}} over {{vocabulary}}.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("query".to_string(), "жалобы".to_string());
        vars.insert("vocabulary".to_string(), "а, б".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Query жалобы over а, б.");
    }

    #[test]
    fn test_custom_variables_do_not_override_provided() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("query".to_string(), "из конфига".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("query".to_string(), "из запроса".to_string());

        let result = prompts.render_with_custom("{{query}}", &vars);
        assert_eq!(result, "из запроса");
    }
}
