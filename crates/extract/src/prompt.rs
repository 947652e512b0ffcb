/// Shared preamble that teaches the model what a JSON Schema instance is.
const JSON_SCHEMA_PREAMBLE: &str = r#"You must format your output as a JSON value that adheres to a given "JSON Schema" instance.

"JSON Schema" is a declarative language that allows you to annotate and validate JSON documents.

For example, the example "JSON Schema" instance {"properties": {"foo": {"description": "a list of test words", "type": "array", "items": {"type": "string"}}}, "required": ["foo"]}
would match an object with one required property, "foo". The "type" property specifies "foo" must be an "array", and the "description" property semantically describes it as "a list of test words". The items within "foo" must be strings.
Thus, the object {"foo": ["bar", "baz"]} is a well-formatted instance of this example "JSON Schema". The object {"properties": {"foo": ["bar", "baz"]}} is not well-formatted.

Your output will be parsed and type-checked according to the provided schema instance, so make sure all fields in your output match the schema exactly and there are no trailing commas!"#;

pub fn build_format_instructions(schema_json: &str, required_field: &str) -> String {
    format!(
        r#"{}

Here is the JSON Schema instance your output must adhere to. Include the enclosing markdown codeblock:
```json
{}
```

Just provide the required info here and not all fields defined in the schema above. "required":["{}"]
"#,
        JSON_SCHEMA_PREAMBLE, schema_json, required_field
    )
}

pub fn build_field_matching_prompt(schema_json: &str, question: &str) -> String {
    format!(
        r#"You are a helpful AI assistant that can match JSON data schema fields with a question. Here is a json schema, please let me know which field in the following schema matches the best with the questions asked.

JSON data schema:
```json
{}
```

Please provide the accurate and exact field name as answer. Also use the format instructions provided here for the answer.

Format Instructions:
{}

Here is the JSON Schema instance your output must adhere to. Include the enclosing markdown codeblock:
```json
{{"field_name":"name of the field"}}
```

Question: {}

Answer:"#,
        schema_json, JSON_SCHEMA_PREAMBLE, question
    )
}

pub fn build_repair_prompt(instructions: &str, completion: &str, error: &str) -> String {
    format!(
        r#"Instructions:
--------------
{}
--------------
Completion:
--------------
{}
--------------

Above, the Completion did not satisfy the constraints given in the Instructions.
Error:
--------------
{}
--------------

Please try again. Please only respond with an answer that satisfies the constraints laid out in the Instructions:"#,
        instructions, completion, error
    )
}

pub fn build_question_rewrite_prompt(chat_history: &str, question: &str) -> String {
    format!(
        r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question.

Chat History:
{}
Follow Up Input: {}
Standalone question:"#,
        chat_history, question
    )
}

pub fn build_answer_prompt(context: &str, question: &str, format_instructions: &str) -> String {
    format!(
        r#"You are a helpful AI assistant. Use the following pieces of context to answer the question at the end.
If you don't know the answer, just say you don't know. DO NOT try to make up an answer.
If the question is not related to the context, politely respond that you are tuned to only answer questions that are related to the context.

Context:
{}

Question:
{}

Also use the format instructions provided here
Format Instructions:
{}

Helpful answer:"#,
        context, question, format_instructions
    )
}
