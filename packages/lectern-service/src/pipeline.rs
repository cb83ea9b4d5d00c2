use serde::{Deserialize, Serialize};

use lectern_domain::{chat::ChatMessage, document::Citation, session::SessionSnapshot};

use crate::{Grounding, LecternService, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
	pub user_id: String,
	pub session_id: String,
	pub query: String,
	/// Earlier turns of the conversation, oldest first, excluding `query`.
	#[serde(default)]
	pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
	pub reply: String,
	pub citations: Vec<Citation>,
	pub session: SessionSnapshot,
	/// Whether the reply was generated from grounded notes.
	pub answered: bool,
}

impl LecternService {
	/// Runs one conversational turn: resolve, ground, persist, then answer or reply.
	///
	/// Turns of the same session run one at a time. Upstream failures are answered in band;
	/// `Err` is reserved for malformed requests and sessions owned by another user.
	pub async fn execute(&self, req: ChatTurnRequest) -> Result<ChatTurnResponse> {
		crate::validate_turn(&req.user_id, &req.session_id, &req.query)?;

		let _guard = self.sessions.lock(&req.session_id).await;
		let mut session = self.sessions.load_or_create(&req.session_id, &req.user_id)?;

		session.record_query(&req.query);

		let intent = self.resolve_intent(&req.query, &req.history, &session).await;
		let grounding = self.ground(&intent, &mut session, &req.query, &req.history).await;

		self.sessions.put(session.clone());

		let (reply, citations, answered) = match grounding {
			Grounding::Answer(ctx) => {
				let reply = self.generate_from_grounded_context(&req.query, &ctx, &req.history).await;

				(reply, ctx.citations(), true)
			},
			Grounding::Reply(reply) => {
				let citations: Vec<Citation> =
					session.candidates().iter().map(|doc| doc.citation()).collect();

				(reply, citations, false)
			},
		};

		tracing::info!(
			session_id = session.id(),
			answered,
			citations = citations.len(),
			"Chat turn completed."
		);

		Ok(ChatTurnResponse { reply, citations, session: session.snapshot(), answered })
	}
}
