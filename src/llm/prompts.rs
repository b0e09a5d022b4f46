//! Prompt assembly for grounded answer generation.

use crate::types::Chunk;

/// Renders retrieved chunks as a numbered context block. Source numbering
/// is 1-based and matches the citation markers the prompts ask for.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}: {}]\n{}\n",
                i + 1,
                chunk.metadata.source,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Grounded-answer prompt without citation markers.
pub fn rag_prompt(query: &str, context: &str) -> String {
    format!(
        "Answer the question based on the provided context. If the context \
         does not contain enough information to answer the question, say so \
         clearly instead of guessing.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer:"
    )
}

/// Grounded-answer prompt that asks for inline `[Source N]` citations.
pub fn rag_prompt_with_citations(query: &str, context: &str) -> String {
    format!(
        "Answer the question based on the provided context. Cite the sources \
         you use with their bracketed numbers, e.g. [Source 1]. If the \
         context does not contain enough information to answer the question, \
         say so clearly instead of guessing.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use chrono::Utc;

    fn chunk(source: &str, content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                file_name: source.to_string(),
                file_type: ".txt".into(),
                loaded_at: Utc::now(),
                chunk_id: 0,
                total_chunks: 1,
                chunk_size: content.chars().count(),
            },
        }
    }

    #[test]
    fn context_numbers_sources_from_one() {
        let rendered = format_context(&[
            chunk("a.txt", "first passage"),
            chunk("b.txt", "second passage"),
        ]);
        assert!(rendered.contains("[Source 1: a.txt]\nfirst passage"));
        assert!(rendered.contains("[Source 2: b.txt]\nsecond passage"));
    }

    #[test]
    fn prompts_embed_query_and_context() {
        let plain = rag_prompt("what is rust", "CONTEXT");
        assert!(plain.contains("Question: what is rust"));
        assert!(plain.contains("Context:\nCONTEXT"));
        assert!(!plain.contains("[Source 1]"));

        let cited = rag_prompt_with_citations("what is rust", "CONTEXT");
        assert!(cited.contains("[Source 1]"));
    }
}
