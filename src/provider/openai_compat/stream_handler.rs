//! Stream handling for OpenAI-compatible SSE responses.
//!
//! [`ChunkStream`] pulls raw transport lines on demand, decodes each
//! `data:` frame into a [`ChatCompletionChunk`] and merges it into a
//! [`CompletionAccumulator`] before yielding it unchanged.

use super::convert::COMPLETION_OBJECT;
use super::response::{ChatCompletion, ChatCompletionMessage, Choice};
use super::stream::{ChatCompletionChunk, ChunkChoice};
use crate::provider::error::Error;
use crate::provider::stream::ToolCallAccumulator;
use crate::provider::types::{FinishReason, Role, Usage};
use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Prefix of every frame that carries a payload.
pub const DATA_PREFIX: &str = "data: ";
/// Payload that ends a stream normally.
pub const DONE_MARKER: &str = "[DONE]";

/// Raw transport lines in arrival order. An `Err` item means the connection broke.
pub type LineStream = BoxStream<'static, Result<String, Error>>;

/// Classification of one transport line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame<'a> {
    Data(&'a str),
    Done,
    Skip,
}

pub(crate) fn classify(line: &str) -> Frame<'_> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };
    match payload.trim_end() {
        DONE_MARKER => Frame::Done,
        "" => Frame::Skip,
        _ => Frame::Data(payload),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Done,
    Failed,
}

/// Lazy sequence of chunks decoded from one streaming response.
///
/// Yields zero or more chunks, then either ends (after `data: [DONE]`) or
/// yields exactly one terminal error. Dropping it early drops the line
/// source and releases the underlying connection.
pub struct ChunkStream {
    lines: LineStream,
    accumulator: CompletionAccumulator,
    state: State,
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("accumulator", &self.accumulator)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ChunkStream {
    pub fn new(lines: LineStream) -> Self {
        Self {
            lines,
            accumulator: CompletionAccumulator::new(),
            state: State::Open,
        }
    }

    /// True once `data: [DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Merge state of every chunk yielded so far.
    pub fn accumulator(&self) -> &CompletionAccumulator {
        &self.accumulator
    }

    /// Merged completion of the chunks yielded so far.
    pub fn into_completion(self) -> ChatCompletion {
        self.accumulator.finish()
    }

    /// Drive the stream to its end and return the merged completion.
    pub async fn collect_full(mut self) -> Result<ChatCompletion, Error> {
        while let Some(chunk) = self.next().await {
            chunk?;
        }
        Ok(self.into_completion())
    }

    fn fail(&mut self, error: Error) -> Poll<Option<Result<ChatCompletionChunk, Error>>> {
        self.state = State::Failed;
        Poll::Ready(Some(Err(error)))
    }
}

impl Stream for ChunkStream {
    type Item = Result<ChatCompletionChunk, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.state != State::Open {
                return Poll::Ready(None);
            }

            let line = match ready!(this.lines.poll_next_unpin(cx)) {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    tracing::warn!("Stream read failed: {e}");
                    let error = match e {
                        e @ Error::StreamInterrupted(_) => e,
                        e if e.is_protocol() => e,
                        other => Error::StreamInterrupted(other.to_string()),
                    };
                    return this.fail(error);
                }
                None => {
                    tracing::warn!("Stream ended before [DONE]");
                    return this.fail(Error::StreamInterrupted(
                        "connection closed before [DONE]".into(),
                    ));
                }
            };

            match classify(&line) {
                Frame::Skip => {
                    tracing::trace!(line = %line, "Skipping non-data line");
                }
                Frame::Done => {
                    tracing::debug!(
                        choices = this.accumulator.choices.len(),
                        "Stream complete"
                    );
                    this.state = State::Done;
                    return Poll::Ready(None);
                }
                Frame::Data(payload) => match ChatCompletionChunk::from_json(payload) {
                    Ok(chunk) => {
                        this.accumulator.apply(&chunk);
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse chunk: {e}\nData: {payload}");
                        let error = Error::MalformedChunk {
                            line: line.clone(),
                            reason: e.to_string(),
                        };
                        return this.fail(error);
                    }
                },
            }
        }
    }
}

impl FusedStream for ChunkStream {
    fn is_terminated(&self) -> bool {
        self.state != State::Open
    }
}

/// Wrap a line source into a lazy chunk stream.
pub fn stream<S>(lines: S) -> ChunkStream
where
    S: Stream<Item = Result<String, Error>> + Send + 'static,
{
    ChunkStream::new(lines.boxed())
}

/// Consume a whole line source into one merged completion.
pub async fn collect_full<S>(lines: S) -> Result<ChatCompletion, Error>
where
    S: Stream<Item = Result<String, Error>> + Send + 'static,
{
    stream(lines).collect_full().await
}

/// Merges chunks into a complete response, one message per choice index.
#[derive(Debug, Default)]
pub struct CompletionAccumulator {
    id: Option<String>,
    created: Option<u64>,
    model: Option<String>,
    choices: BTreeMap<u32, ChoiceAccumulator>,
    usage: Option<Usage>,
}

impl CompletionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, chunk: &ChatCompletionChunk) {
        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id.clone());
        }
        if self.model.is_none() && !chunk.model.is_empty() {
            self.model = Some(chunk.model.clone());
        }
        if self.created.is_none() && chunk.created > 0 {
            self.created = Some(chunk.created);
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        for choice in &chunk.choices {
            self.choices.entry(choice.index).or_default().apply(choice);
        }
    }

    /// Last non-null finish reason seen for a choice.
    pub fn finish_reason(&self, index: u32) -> Option<FinishReason> {
        self.choices.get(&index).and_then(|c| c.finish_reason)
    }

    /// Build the merged completion.
    ///
    /// A stream that carried no choices still yields one empty assistant
    /// message at index 0 so `choices[0]` is always addressable.
    pub fn finish(self) -> ChatCompletion {
        let mut choices: Vec<Choice> = self
            .choices
            .into_iter()
            .map(|(index, choice)| choice.finish(index))
            .collect();
        if choices.is_empty() {
            choices.push(ChoiceAccumulator::default().finish(0));
        }

        ChatCompletion {
            id: self.id.unwrap_or_default(),
            object: COMPLETION_OBJECT.to_string(),
            created: self.created.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            choices,
            usage: self.usage,
        }
    }
}

#[derive(Debug, Default)]
struct ChoiceAccumulator {
    role: Option<Role>,
    content: Option<String>,
    reasoning_content: Option<String>,
    tool_calls: ToolCallAccumulator,
    finish_reason: Option<FinishReason>,
}

impl ChoiceAccumulator {
    fn apply(&mut self, choice: &ChunkChoice) {
        let delta = &choice.delta;
        if self.role.is_none() {
            self.role = delta.role;
        }
        append(&mut self.content, delta.content.as_deref());
        append(&mut self.reasoning_content, delta.reasoning_content.as_deref());
        for fragment in delta.tool_calls.iter().flatten() {
            self.tool_calls.apply(fragment);
        }
        if choice.finish_reason.is_some() {
            self.finish_reason = choice.finish_reason;
        }
    }

    fn finish(self, index: u32) -> Choice {
        let tool_calls = if self.tool_calls.is_empty() {
            None
        } else {
            Some(self.tool_calls.finish())
        };

        Choice {
            index,
            message: ChatCompletionMessage {
                role: self.role.unwrap_or_default(),
                content: self.content,
                reasoning_content: self.reasoning_content,
                tool_calls,
            },
            finish_reason: self.finish_reason,
        }
    }
}

fn append(target: &mut Option<String>, fragment: Option<&str>) {
    if let Some(text) = fragment {
        target.get_or_insert_with(String::new).push_str(text);
    }
}
