use tracing::{debug, info};

use crate::api::FlairTemplate;

/// How a requested flair gets sent to `/api/submit`: by template id when
/// a template matches, otherwise as raw text (some subreddits accept it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlairChoice {
    Template { id: String },
    Text(String),
}

/// Match requested flair text against the subreddit's link templates.
/// Exact (case-insensitive) match wins, then substring match in either
/// direction, then raw-text fallback. Blank input selects no flair.
pub fn resolve_flair(templates: &[FlairTemplate], wanted: &str) -> Option<FlairChoice> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return None;
    }
    let wanted_lower = wanted.to_lowercase();

    for template in templates {
        if template.text.to_lowercase() == wanted_lower {
            debug!(flair = %wanted, id = %template.id, "exact flair template match");
            return Some(FlairChoice::Template {
                id: template.id.clone(),
            });
        }
    }

    for template in templates {
        let text_lower = template.text.to_lowercase();
        if !text_lower.is_empty()
            && (text_lower.contains(&wanted_lower) || wanted_lower.contains(&text_lower))
        {
            debug!(
                flair = %wanted,
                template = %template.text,
                id = %template.id,
                "partial flair template match"
            );
            return Some(FlairChoice::Template {
                id: template.id.clone(),
            });
        }
    }

    info!(flair = %wanted, "no template match, falling back to flair text");
    Some(FlairChoice::Text(wanted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> Vec<FlairTemplate> {
        vec![
            FlairTemplate {
                id: "id-discussion".to_string(),
                text: "Discussion".to_string(),
                mod_only: false,
            },
            FlairTemplate {
                id: "id-help".to_string(),
                text: "Help Wanted".to_string(),
                mod_only: false,
            },
        ]
    }

    #[test]
    fn blank_flair_selects_nothing() {
        assert_eq!(resolve_flair(&templates(), ""), None);
        assert_eq!(resolve_flair(&templates(), "   "), None);
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let choice = resolve_flair(&templates(), "discussion");
        assert_eq!(
            choice,
            Some(FlairChoice::Template {
                id: "id-discussion".to_string()
            })
        );
    }

    #[test]
    fn partial_match_works_both_directions() {
        // Requested text contained in a template.
        let choice = resolve_flair(&templates(), "help");
        assert_eq!(
            choice,
            Some(FlairChoice::Template {
                id: "id-help".to_string()
            })
        );

        // Template text contained in the request.
        let choice = resolve_flair(&templates(), "weekly discussion thread");
        assert_eq!(
            choice,
            Some(FlairChoice::Template {
                id: "id-discussion".to_string()
            })
        );
    }

    #[test]
    fn exact_match_beats_partial() {
        let mut t = templates();
        t.push(FlairTemplate {
            id: "id-exact".to_string(),
            text: "Help".to_string(),
            mod_only: false,
        });
        let choice = resolve_flair(&t, "Help");
        assert_eq!(
            choice,
            Some(FlairChoice::Template {
                id: "id-exact".to_string()
            })
        );
    }

    #[test]
    fn unmatched_flair_falls_back_to_text() {
        let choice = resolve_flair(&templates(), "Showcase");
        assert_eq!(choice, Some(FlairChoice::Text("Showcase".to_string())));
    }

    #[test]
    fn no_templates_falls_back_to_text() {
        let choice = resolve_flair(&[], "Discussion");
        assert_eq!(choice, Some(FlairChoice::Text("Discussion".to_string())));
    }
}
