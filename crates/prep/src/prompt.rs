pub fn build_glossary_prompt(keywords: &[String]) -> String {
    let terms: String = keywords
        .iter()
        .map(|k| format!("- {}\n", k))
        .collect();

    format!(
        r#"You are building a glossary for a set of scientific research documents.

INSTRUCTIONS:
1. Write a short, one-sentence definition for every term listed below
2. Output exactly one line per term
3. Use the exact format: term – definition
4. No numbering, no markdown, no explanations

TERMS:
{}
GLOSSARY:"#,
        terms
    )
}
