#![forbid(unsafe_code)]

//! The product walkthrough shown on the marketing site.
//!
//! Order matters: the first step is where unknown or missing `step` values
//! land, and the last step carries the pilot call to action.

use crate::step::{
    Bubble, BubblePlacement, Chapter, RegistryError, ScreenContent, ScreenKind, StepDefinition,
    StepRegistry,
};

pub fn stu_walkthrough() -> Result<StepRegistry, RegistryError> {
    StepRegistry::new(steps())
}

fn steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("overview", Chapter::Overview, "Hiring readiness at a glance", || {
            ScreenContent::new(ScreenKind::RecruiterDashboard, "Campus pipeline")
                .highlight("Readiness scores across every active cohort")
                .highlight("Filters for role family, graduation term, and location")
        })
        .bubble(
            Bubble::new(
                "why-stu",
                "One view of readiness",
                "Stu turns coursework, projects, and practice interviews into a single readiness signal.",
            )
            .placed(BubblePlacement::TopLeft),
        )
        .bubble(
            Bubble::new(
                "two-sides",
                "Built for both sides",
                "Recruiters see who is ready; students see what to work on next.",
            )
            .placed(BubblePlacement::BottomRight),
        )
        .context("recruiter", "awareness", "understand the product"),
        StepDefinition::new(
            "recruiter-pipeline",
            Chapter::Recruiter,
            "Sort the pipeline by readiness",
            || {
                ScreenContent::new(ScreenKind::RecruiterDashboard, "Pipeline by readiness")
                    .highlight("Sort by overall score or a single competency")
                    .highlight("Shortlist candidates without opening every resume")
            },
        )
        .bubble(
            Bubble::new(
                "sort",
                "Readiness first",
                "Rank candidates by demonstrated skill instead of keyword matches.",
            )
            .placed(BubblePlacement::TopRight)
            .offset(-16, 12),
        )
        .bubble(
            Bubble::new(
                "filters",
                "Narrow the list",
                "Combine role, term, and location filters; counts update as you go.",
            )
            .placed(BubblePlacement::CenterRight),
        )
        .context("recruiter", "evaluation", "prioritize candidates"),
        StepDefinition::new(
            "candidate-profile",
            Chapter::Recruiter,
            "Open a candidate profile",
            || {
                ScreenContent::new(ScreenKind::CandidateProfile, "Candidate profile")
                    .highlight("Competency breakdown with evidence links")
                    .highlight("Interview-ready summary for hiring managers")
            },
        )
        .bubble(
            Bubble::new(
                "evidence",
                "Evidence behind every score",
                "Each competency links to the projects and practice sessions that earned it.",
            )
            .placed(BubblePlacement::CenterLeft),
        )
        .context("recruiter", "evaluation", "assess a candidate"),
        StepDefinition::new(
            "student-readiness",
            Chapter::Student,
            "Students see their readiness",
            || {
                ScreenContent::new(ScreenKind::ReadinessReport, "Your readiness report")
                    .highlight("Score by competency against target roles")
                    .highlight("Strengths and gaps in plain language")
            },
        )
        .bubble(
            Bubble::new(
                "score",
                "A score that explains itself",
                "Students see exactly which skills move their readiness and by how much.",
            )
            .placed(BubblePlacement::TopLeft),
        )
        .bubble(
            Bubble::new(
                "targets",
                "Matched to real roles",
                "Targets come from the roles recruiters are hiring for this term.",
            )
            .placed(BubblePlacement::BottomLeft)
            .offset(8, -8),
        )
        .context("student", "activation", "understand readiness"),
        StepDefinition::new("student-plan", Chapter::Student, "A plan for the next step", || {
            ScreenContent::new(ScreenKind::PracticePlan, "Practice plan")
                .highlight("Weekly tasks ranked by readiness impact")
                .highlight("Mock interviews scheduled against target roles")
        })
        .bubble(
            Bubble::new(
                "plan",
                "Focused practice",
                "The plan picks the few tasks that close the largest gaps first.",
            )
            .placed(BubblePlacement::CenterRight),
        )
        .context("student", "engagement", "improve readiness"),
        StepDefinition::new("pilot", Chapter::Pilot, "Run a pilot with your cohort", || {
            ScreenContent::new(ScreenKind::PilotSummary, "Pilot outcomes")
                .highlight("Set up in a week with your existing applicant list")
                .highlight("Readiness lift reported at the end of the term")
        })
        .context("recruiter", "conversion", "request a pilot"),
    ]
}
