//! Deterministic prompt assembly from retrieved papers and a user question.

use crate::paper::PaperRecord;

/// Render the context-plus-question prompt sent as the user turn.
///
/// One block per paper, in input order, joined by a blank line, then the
/// verbatim question inside the fixed instruction template. Paper text is
/// passed through unescaped; the prompt is plain text.
pub fn build_prompt(question: &str, papers: &[PaperRecord]) -> String {
    let context = papers
        .iter()
        .map(|paper| {
            format!(
                "Paper: {}\nAuthors: {}\nAbstract: {}\n",
                paper.title,
                paper.author_line(),
                paper.abstract_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on these research papers:\n\n{context}\n\nPlease answer this question: {question}\n\n\
         Provide a clear, comprehensive answer that:\n\
         1. Directly addresses the question\n\
         2. Cites specific papers when referring to their findings\n\
         3. Mentions any relevant limitations or uncertainties\n\
         4. Uses accessible language while maintaining technical accuracy\n"
    )
}

/// Render the reference footer appended to every generated answer.
pub fn format_references(papers: &[PaperRecord]) -> String {
    let lines = papers
        .iter()
        .map(|paper| format!("- {} ({})", paper.title, paper.author_line()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\nReferences:\n{lines}")
}
