pub const ANALYSIS_SYSTEM: &str = "You are an experienced technical recruiter and resume coach. \
    You compare a candidate resume with a job description and give honest, specific feedback. \
    Respond with a single JSON object and nothing else. \
    Do NOT use markdown code fences.";

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following resume against the job description.

RESUME:
{resume_text}

JOB DESCRIPTION:
{job_description}

Return JSON with exactly these fields:
{
  "match_score": <integer 0-100, how well the resume fits the role>,
  "summary": "<a few paragraphs covering key strengths that align with the job and areas for improvement>",
  "missing_skills": ["<skill or qualification the job asks for that the resume lacks>", ...],
  "recommendations": ["<specific, actionable change to the resume>", ...]
}

List at most 5 missing skills and at most 5 recommendations."#;

pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{resume_text}", resume_text)
        .replace("{job_description}", job_description)
}
