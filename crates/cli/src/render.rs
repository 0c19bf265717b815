use retrieval_core::SectionResult;
use std::fmt::Write;

const PREVIEW_CHARS: usize = 160;

/// Plain-text listing of ranked sections for terminal output.
pub fn sections_text(sections: &[SectionResult]) -> String {
    if sections.is_empty() {
        return "No sections matched.\n".to_string();
    }
    let mut out = String::new();
    for (rank, s) in sections.iter().enumerate() {
        let mut title = s.header.clone();
        for part in [&s.secondary_header, &s.sub_header] {
            if !part.is_empty() {
                title.push_str(" > ");
                title.push_str(part);
            }
        }
        let page = s
            .page_number
            .map(|p| format!("p.{}", p))
            .unwrap_or_else(|| "p.-".to_string());
        let _ = writeln!(
            out,
            "{:>2}. [{:.3}] {} ({}, {} chunk(s))",
            rank + 1,
            s.top_score(),
            title,
            page,
            s.related_chunks.len()
        );
        let _ = writeln!(out, "    {}", preview(&s.content));
    }
    out
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
