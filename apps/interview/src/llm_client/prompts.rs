// Prompt constants for the interview and feedback calls.
// Templates use `{placeholder}` markers replaced before sending.

/// Interviewer persona prompt, seeded as the transcript's system entry.
/// Replace: {name}, {experience}, {skills}, {level}, {position}, {company}
pub const INTERVIEWER_SYSTEM_TEMPLATE: &str = "You are an HR executive that interviews an \
    interviewee called {name} with experience {experience} and skills {skills}. \
    You should interview them for the position {level} {position} at the company {company}.";

/// Default feedback instruction. Asks for a fixed two-line format:
/// a 1–10 score followed by prose feedback.
pub const FEEDBACK_SYSTEM: &str = "You are a helpful tool that provides feedback on an \
interviewee performance. Before the Feedback give a score of 1 to 10.
Follow this format:
Overal Score: //Your score
Feedback: //Here you put your feedback
Give only the feedback do not ask any additional questions.";

/// Default feedback user message. Replace: {transcript}
pub const FEEDBACK_USER_TEMPLATE: &str = "This is the interview you need to evaluate. \
    Keep in mind that you are only a tool. \
    And you shouldn't engage in any conversation: {transcript}";

/// Marker the feedback user template must contain.
pub const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

/// Fills `{placeholder}` markers in one left-to-right pass. Substituted
/// values are never scanned again, so user text containing a marker stays
/// literal. Unknown markers are left as they are.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(marker, _)| tail.starts_with(marker)) {
            Some((marker, value)) => {
                out.push_str(value);
                rest = &tail[marker.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
