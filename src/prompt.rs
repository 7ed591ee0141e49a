//! The fixed instruction template sent to the model.

/// Persona and output convention for the outreach draft. The subject/body
/// split is a convention the model is asked to follow, not a parsed schema.
pub const SYSTEM_PROMPT: &str = "You are an outreach assistant for an automation consultancy. \
You read text scraped from a business's website, identify concrete processes the business could \
automate, and draft a short, friendly cold outreach email proposing help with those. Write \
plainly, avoid hype, and keep the email under 180 words. Start with a subject line in the form \
`Subject: ...`, then a blank line, then the body.";

/// Build the user message: the fixed instruction with the scraped excerpt
/// interpolated once.
pub fn outreach_prompt(excerpt: &str, title: Option<&str>) -> String {
    let mut prompt = String::new();
    prompt.push_str("Below is text extracted from a business website");
    if let Some(title) = title {
        prompt.push_str(&format!(" titled {title:?}"));
    }
    prompt.push_str(
        ".\n\nIdentify the most promising automation opportunities for this business and draft \
a cold outreach email offering to build them.\n\nWebsite text:\n---\n",
    );
    prompt.push_str(excerpt);
    prompt.push_str("\n---\n");
    prompt
}
