//! Plain-text views of a processing result.

use std::fmt::Write;

use anyhow::Result;

use dossier_core::{
    top_sections, ProcessingResult, RankTier, RelevanceTier, ReportSummary, ReportView,
};

/// Sections shown in the overview preview.
const OVERVIEW_SECTIONS: usize = 3;

pub fn render(view: ReportView, result: &ProcessingResult) -> Result<String> {
    let out = match view {
        ReportView::Overview => overview(result),
        ReportView::Sections => sections(result),
        ReportView::Analysis => analysis(result),
        ReportView::Json => result.to_json_pretty()?,
    };
    Ok(out)
}

fn overview(result: &ProcessingResult) -> String {
    let summary = ReportSummary::from_result(result);
    let persona = &result.metadata.persona;
    let task = &result.metadata.task;
    let mut out = String::new();

    let _ = writeln!(out, "Analysis Results");
    let _ = writeln!(out, "  Documents analyzed:  {}", summary.documents_analyzed);
    let _ = writeln!(out, "  Sections extracted:  {}", summary.sections_extracted);
    let _ = writeln!(out, "  Key insights:        {}", summary.key_insights);
    let _ = writeln!(out, "  Average relevance:   {}%", summary.average_relevance);
    let _ = writeln!(out, "  Processing time:     {}s", summary.processing_time_seconds);
    let _ = writeln!(out);
    let _ = writeln!(out, "Persona: {} ({})", persona.role, persona.experience);
    let _ = writeln!(out, "  Expertise:   {}", persona.expertise.as_slice().join(", "));
    let _ = writeln!(out, "  Focus areas: {}", persona.focus_areas.as_slice().join(", "));
    let _ = writeln!(out, "Task: {}", task.task);
    let _ = writeln!(out, "  Expected output: {}", task.expected_output);
    let _ = writeln!(out, "  Priority: {}  Timeline: {}", task.priority, task.timeline.label());
    let _ = writeln!(out);
    let _ = writeln!(out, "Top sections:");
    for section in top_sections(result, OVERVIEW_SECTIONS) {
        let _ = writeln!(
            out,
            "  #{} {} ({}, p. {})",
            section.importance_rank, section.section_title, section.document, section.page_number
        );
    }
    out
}

fn sections(result: &ProcessingResult) -> String {
    let mut out = String::new();
    for section in &result.extracted_sections {
        let tier = match RankTier::for_rank(section.importance_rank) {
            RankTier::High => "high",
            RankTier::Medium => "medium",
            RankTier::Low => "low",
        };
        let _ = writeln!(
            out,
            "#{} [{}] {}\n    {} p. {}\n    {}",
            section.importance_rank,
            tier,
            section.section_title,
            section.document,
            section.page_number,
            section.content
        );
    }
    out
}

fn analysis(result: &ProcessingResult) -> String {
    let mut out = String::new();
    for item in &result.sub_section_analysis {
        let tier = match RelevanceTier::for_score(item.relevance_score) {
            RelevanceTier::Strong => "strong",
            RelevanceTier::Moderate => "moderate",
            RelevanceTier::Weak => "weak",
        };
        let _ = writeln!(
            out,
            "{:.2}% [{}] {} p. {}\n    {}",
            item.relevance_score, tier, item.document, item.page_number, item.refined_text
        );
        for insight in &item.key_insights {
            let _ = writeln!(out, "    - {}", insight);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_core::{
        DocumentCandidate, DocumentSet, Persona, Priority, StandInSynthesizer, SynthesisRequest,
        Synthesizer, Task, Timeline,
    };
    use std::time::Duration;

    fn result() -> ProcessingResult {
        let documents = DocumentSet::from_candidates(
            ["a.pdf", "b.pdf", "c.pdf"].into_iter().map(|n| DocumentCandidate::pdf(n, 10)),
        );
        let persona =
            Persona::from_parts("Student", ["Chemistry"], ["Kinetics"], "2 years").unwrap();
        let task = Task::new("Study", "Guide", Priority::Medium, Timeline::WithinWeek);
        let request = SynthesisRequest {
            documents: &documents,
            persona: &persona,
            task: &task,
            elapsed: Duration::from_secs(4),
            timestamp: chrono::Utc::now(),
        };
        StandInSynthesizer::seeded(8).synthesize(&request).unwrap()
    }

    #[test]
    fn test_overview_previews_three_sections() {
        let out = render(ReportView::Overview, &result()).unwrap();
        assert!(out.contains("Documents analyzed:  3"));
        assert!(out.contains("Sections extracted:  6"));
        assert!(out.contains("Persona: Student (2 years)"));
        assert!(out.contains("  #3 "));
        assert!(!out.contains("  #4 "));
    }

    #[test]
    fn test_sections_and_analysis_views() {
        let result = result();
        let sections = render(ReportView::Sections, &result).unwrap();
        assert!(sections.contains("#1 [high]"));
        assert!(sections.contains("#5 [medium]"));

        let analysis = render(ReportView::Analysis, &result).unwrap();
        assert_eq!(analysis.matches("Kinetics focus area").count(), 4);
        assert!(analysis.contains("    - Key methodology identified"));
    }

    #[test]
    fn test_json_view_is_export() {
        let result = result();
        let json = render(ReportView::Json, &result).unwrap();
        assert_eq!(ProcessingResult::from_json(&json).unwrap(), result);
    }
}
