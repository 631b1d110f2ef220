use async_trait::async_trait;
use rigvoice::error::{RigError, RigResult};
use rigvoice::llm::{
    GeneratedStream, GeneratedText, GenerationParameters, Message, TextModel,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;

/// One scripted model turn
pub enum ScriptedReply {
    Text(String),
    Provider { status: u16, body: String },
}

impl ScriptedReply {
    pub fn text(t: impl Into<String>) -> Self {
        ScriptedReply::Text(t.into())
    }
}

/// Model backend that plays back scripted replies in order
pub struct MockModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl MockModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    fn next(&self) -> RigResult<String> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("mock model ran out of scripted replies");
        match reply {
            ScriptedReply::Text(t) => Ok(t),
            ScriptedReply::Provider { status, body } => Err(RigError::Provider { status, body }),
        }
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn generate(
        &self,
        _messages: &[Message],
        _params: &GenerationParameters,
    ) -> RigResult<GeneratedText> {
        self.next().map(GeneratedText::done)
    }

    async fn generate_stream(
        &self,
        _messages: &[Message],
        _params: &GenerationParameters,
    ) -> RigResult<GeneratedStream> {
        let full = self.next()?;
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        tokio::spawn(async move {
            // Stream the reply in growing prefixes, as a provider would
            let mid = full.len() / 2;
            let boundary = (0..=mid)
                .rev()
                .find(|i| full.is_char_boundary(*i))
                .unwrap_or(0);
            let _ = tx
                .send(Ok(GeneratedText::partial(&full[..boundary], None)))
                .await;
            let _ = tx.send(Ok(GeneratedText::partial(full.clone(), None))).await;
            let _ = tx.send(Ok(GeneratedText::done(full))).await;
        });
        Ok(ReceiverStream::new(rx))
    }
}
