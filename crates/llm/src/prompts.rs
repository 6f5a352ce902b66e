//! Prompt construction for conversational retrieval.
//!
//! A follow-up question is first rewritten into a standalone question using the
//! transcript so far; the standalone question drives retrieval, and the retrieved
//! chunks are then stuffed into a single answering prompt.

use crate::models::ChatMessage;

/// Renders prior exchanges as `\nHuman: ...\nAssistant: ...` turns.
pub fn format_history<'a, I>(history: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    history
        .into_iter()
        .map(|(question, answer)| format!("\nHuman: {question}\nAssistant: {answer}"))
        .collect()
}

pub fn condense_question_messages<'a, I>(history: I, question: &str) -> Vec<ChatMessage>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let history = format_history(history);
    let prompt = format!(
        "Given the following conversation and a follow up question, \
         rephrase the follow up question to be a standalone question, in its original language.\n\n\
         Chat History:{history}\nFollow Up Input: {question}\nStandalone question:"
    );
    vec![ChatMessage::user(prompt)]
}

pub fn answer_messages<'a, I>(context: I, question: &str) -> Vec<ChatMessage>
where
    I: IntoIterator<Item = &'a str>,
{
    let context = context.into_iter().collect::<Vec<_>>().join("\n\n");
    vec![
        ChatMessage::system(format!(
            "Use the following pieces of context to answer the user's question. \n\
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
             ----------------\n{context}"
        )),
        ChatMessage::user(question.to_string()),
    ]
}
