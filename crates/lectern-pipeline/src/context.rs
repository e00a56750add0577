//! Context assembly for answer synthesis.

use lectern_core::types::Passage;

/// Join passage texts in order, separated by a blank line.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the fixed synthesis prompt embedding the context and question.
pub fn synthesis_prompt(context: &str, query: &str) -> String {
    format!(
        "Use the following context to answer the question.\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}\n\n\
         Answer (detailed and grounded in the context):"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_context_joins_with_blank_line() {
        let passages = vec![Passage::new("first"), Passage::new("second")];
        assert_eq!(format_context(&passages), "first\n\nsecond");
    }

    #[test]
    fn test_format_context_single_passage() {
        let passages = vec![Passage::new("only")];
        assert_eq!(format_context(&passages), "only");
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_format_context_preserves_order() {
        let passages = vec![
            Passage::new("a"),
            Passage::new("b"),
            Passage::new("c"),
        ];
        assert_eq!(format_context(&passages), "a\n\nb\n\nc");
    }

    #[test]
    fn test_synthesis_prompt_embeds_both() {
        let prompt = synthesis_prompt("some context", "what is working memory?");
        assert!(prompt.starts_with("Use the following context"));
        assert!(prompt.contains("Context:\nsome context"));
        assert!(prompt.contains("Question:\nwhat is working memory?"));
        assert!(prompt.ends_with("Answer (detailed and grounded in the context):"));
    }
}
