//! Streaming tool loop
//!
//! Each round consumes one provider stream. Text is forwarded as soon as it
//! arrives while tool calls are held in a [`RoundBuffer`]. On the terminal
//! chunk the buffered calls are executed and a new round starts, or the
//! terminal chunk is forwarded and the stream ends.

use std::collections::VecDeque;

use conduit_llm::{ChunkStream, FinishReason, LlmError, StreamChunk, ToolCall};
use futures_util::StreamExt;

use crate::engine::Conversation;

/// Chunk emitted between tool rounds
pub const TOOL_RESULTS_MARKER: &str = "\n\n[Processing tool results...]\n\n";

type Item = Result<StreamChunk, LlmError>;

pub(crate) fn tool_loop(conversation: Conversation) -> ChunkStream {
    let run = StreamRun {
        conversation,
        round: 0,
        phase: Phase::Idle,
        pending: VecDeque::new(),
    };

    Box::pin(futures_util::stream::unfold(run, |mut run| async move {
        let item = run.next_item().await?;
        Some((item, run))
    }))
}

enum Phase {
    /// Next round not started yet
    Idle,
    Streaming { inner: ChunkStream, buffer: RoundBuffer },
    Finished,
}

/// What one round has produced so far; a new one per round
#[derive(Default)]
struct RoundBuffer {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl RoundBuffer {
    /// Record a chunk, returning the text to forward if it carried any
    fn absorb(&mut self, chunk: StreamChunk) -> Option<StreamChunk> {
        self.tool_calls.extend(chunk.tool_calls.into_iter().flatten());

        let text = chunk.content.filter(|text| !text.is_empty())?;
        self.content.push_str(&text);
        Some(StreamChunk::text(text))
    }
}

struct StreamRun {
    conversation: Conversation,
    round: usize,
    phase: Phase,
    pending: VecDeque<Item>,
}

impl StreamRun {
    async fn next_item(&mut self) -> Option<Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }

            // Any path that does not put a phase back ends the stream
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,
                Phase::Idle => {
                    if let Err(e) = self.start_round().await {
                        return Some(Err(e));
                    }
                }
                Phase::Streaming { mut inner, mut buffer } => match inner.next().await {
                    Some(Ok(chunk)) if chunk.done => {
                        drop(inner);
                        let finish_reason = chunk.finish_reason.unwrap_or(FinishReason::Stop);
                        self.forward(buffer.absorb(chunk));
                        self.finish_round(buffer, finish_reason).await;
                    }
                    Some(Ok(chunk)) => {
                        self.forward(buffer.absorb(chunk));
                        self.phase = Phase::Streaming { inner, buffer };
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        tracing::debug!(round = self.round, "provider stream ended without a terminal chunk");
                        self.finish_round(buffer, FinishReason::Stop).await;
                    }
                },
            }
        }
    }

    fn forward(&mut self, chunk: Option<StreamChunk>) {
        if let Some(chunk) = chunk {
            self.pending.push_back(Ok(chunk));
        }
    }

    async fn start_round(&mut self) -> Result<(), LlmError> {
        self.round += 1;
        let conversation = &self.conversation;
        tracing::debug!(round = self.round, provider = %conversation.provider.name(), "stream round");

        let inner = conversation
            .provider
            .stream(
                &conversation.messages,
                conversation.system_prompt.as_deref(),
                conversation.tools.as_deref(),
            )
            .await?;

        self.phase = Phase::Streaming {
            inner,
            buffer: RoundBuffer::default(),
        };
        Ok(())
    }

    async fn finish_round(&mut self, buffer: RoundBuffer, finish_reason: FinishReason) {
        if buffer.tool_calls.is_empty() || !self.conversation.can_execute_tools() {
            self.pending.push_back(Ok(StreamChunk::done(finish_reason)));
            return;
        }

        let max = self.conversation.max_tool_iterations;
        if self.round >= max {
            tracing::warn!(max, "tool loop did not converge");
            self.pending.push_back(Err(LlmError::MaxToolIterations { max }));
            return;
        }

        self.conversation.run_tools(buffer.content, buffer.tool_calls).await;
        self.pending.push_back(Ok(StreamChunk::text(TOOL_RESULTS_MARKER)));
        self.phase = Phase::Idle;
    }
}
