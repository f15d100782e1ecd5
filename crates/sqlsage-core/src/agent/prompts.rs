use crate::model::GoldenSql;

pub fn sql_prompt(schemas: &str, question: &str, examples: &[GoldenSql]) -> String {
    let mut prompt = format!(
        "You are a SQLite expert. Generate a SQL query to answer the user's question.\n\
         Use the provided schema context.\n\
         \n\
         Schema:\n\
         {schemas}\n"
    );
    if !examples.is_empty() {
        prompt.push_str("\nExamples:\n");
        for ex in examples {
            prompt.push_str(&format!("Q: {}\nSQL: {}\n", ex.question, ex.sql));
        }
    }
    prompt.push_str(&format!(
        "\nQuestion: {question}\n\
         Return ONLY the SQL query, without markdown backticks or any explanation.\n\
         Write exact SQL code only, based on the Schema and Question."
    ));
    prompt
}

pub fn analysis_prompt(question: &str, sql: &str, data: &str, language: &str) -> String {
    format!(
        "Analyze the data and answer the user's question in {language}.\n\
         \n\
         Question: {question}\n\
         SQL Query: {sql}\n\
         Data:\n\
         {data}\n"
    )
}

pub fn failure_message(error: &str) -> String {
    format!("An error occurred while running the query: {}", error)
}
