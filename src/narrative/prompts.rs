//! Prompt templates for the four narrative stages.

/// Section layout every stage after research works towards.
pub const SECTION_TEMPLATE: &str = r#"## <Outcome-focused title starting with a strong verb>
**Bullet Point:** <One sentence stating the achievement and its impact> <br />
**Description:** <Three to five sentences: technical context, approach, measurable result>"#;

/// System prompt of the research stage.
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"You are a repository researcher. You read structured evidence extracted from a git history and identify the significant pieces of work one engineer delivered.

Rules:
1. Use only the evidence you are given. Every achievement must point at concrete commits, files or initiatives from it.
2. Impact estimates in the evidence are unverified guesses. You may carry them forward only as estimates and must keep their uncertainty.
3. Prefer fewer, well-supported achievements over many thin ones.
4. Reply with JSON only."#;

/// System prompt of the attribution stage.
pub const ATTRIBUTION_SYSTEM_PROMPT: &str = r#"You are an authorship attributor. You check that each proposed achievement really belongs to the engineer, rank the achievements by authorship confidence and impact, and discard those whose evidence is weak or whose metrics look invented.

Reply with JSON only."#;

/// System prompt of the synthesis stage.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are an impact synthesiser. You turn validated achievements into CV sections for a technical audience.

Writing rules:
- Active voice, no first person.
- Start titles with strong action verbs such as Architected, Optimised, Implemented, Led or Designed.
- Name concrete technologies, patterns and components.
- Quote numbers only when the evidence supports them and keep estimated numbers hedged.
- No lists, no hyperlinks, no vague verbs such as "helped" or "worked on"."#;

/// System prompt of the editing stage.
pub const EDITING_SYSTEM_PROMPT: &str = r#"You are a CV editor. You polish CV sections without adding claims that are not already present.

Return only the finished Markdown sections, with no commentary before or after them."#;

/// Style guidance appended to the editing prompt for `senior_technical_lead`.
const SENIOR_TECHNICAL_LEAD_STYLE: &str = r#"Style: senior technical lead.
- Emphasise architecture and system-level decisions.
- Favour sections about scalability and reliability.
- Show ownership of outcomes beyond individual tasks."#;

/// Style guidance appended to the editing prompt for `simple`.
const SIMPLE_STYLE: &str = r#"Style: simple.
- Keep descriptions to two or three sentences.
- Use plain language and focus on concrete deliverables."#;

/// Research stage user prompt carrying the evidence bundle.
pub fn generate_research_prompt(person: &str, evidence: &str) -> String {
    format!(
        r#"Identify the significant achievements of {person} in the repository evidence below.

Return JSON shaped like:
{{
  "achievements": [
    {{
      "title": "...",
      "evidence": "commits, files or initiative ids backing it",
      "metric_estimate": "hedged estimate, or null",
      "area": "architecture | performance | reliability | feature | infrastructure | quality",
      "commits": ["short hashes"],
      "files": ["paths"],
      "complexity": 1
    }}
  ]
}}

Repository evidence:
{evidence}"#
    )
}

/// Attribution stage user prompt carrying the research output.
pub fn generate_attribution_prompt(person: &str, bullets_count: usize, research: &str) -> String {
    format!(
        r#"Validate the achievements below for {person} and keep the best {bullets_count}.

For each one, judge authorship confidence (High, Medium, Low), impact and evidence quality. Drop anything {person} cannot clearly be credited with.

Return JSON shaped like:
{{
  "validated_achievements": [
    {{ "title": "...", "impact": "...", "metrics": "...", "confidence": "High", "proof": ["..."] }}
  ]
}}

Achievements:
{research}"#
    )
}

/// Synthesis stage user prompt carrying the attribution output.
pub fn generate_synthesis_prompt(bullets_count: usize, attribution: &str) -> String {
    format!(
        r#"Write exactly {bullets_count} sections from the validated achievements below, each following this template exactly:

{SECTION_TEMPLATE}

Validated achievements:
{attribution}"#
    )
}

/// Editing stage user prompt carrying the synthesis output.
pub fn generate_editing_prompt(style: &str, role: &str, sections: &str) -> String {
    let guide = match style {
        "simple" => SIMPLE_STYLE,
        _ => SENIOR_TECHNICAL_LEAD_STYLE,
    };

    format!(
        r#"Polish these CV sections for a {role}.

{guide}

Checklist:
- Every section follows the template: a `##` title, one `**Bullet Point:**` line ending in `<br />`, one `**Description:**` line.
- Titles start with strong action verbs.
- Metrics are specific and no stronger than the evidence.
- No hyperlinks or lists remain.

Sections:
{sections}"#
    )
}
