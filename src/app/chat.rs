pub mod commands;
pub mod context;
pub mod intent;
pub mod response;
pub mod turns;

use crate::app::Session;
use crate::app::types::Message;
use crate::backends::{Backend, BackendRequest};
use crate::catalog::{ContextId, context_config};
use crate::error::ChatError;
use context::{GENERIC_CONTEXT_NAME, build_system_instruction, capabilities_digest, cross_context_digest};
use response::extract_reply;

/// Notice filed in the target context when a request is routed automatically
pub fn routing_notice(context_name: &str) -> String {
    format!("**⚡ 智能路由激活：** 已识别您的意图，自动跳转至【{context_name}】为您服务。")
}

/// A turn whose backend call has not completed yet
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub target: ContextId,
    /// True when the classifier picked the target for this turn
    pub routed: bool,
    pub request: BackendRequest,
}

/// Releases the single-flight flag when a turn ends, even if its future is dropped
struct InFlight<'a> {
    session: &'a mut Session,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.session.in_flight {
            tracing::warn!(session = %self.session.id, "turn cancelled before a reply arrived");
            self.session.in_flight = false;
        }
    }
}

impl Session {
    /// Routes and records the user's input and assembles the backend request.
    ///
    /// Fails with [`ChatError::Busy`] while another turn is in flight.
    pub fn begin_turn(&mut self, input: &str) -> Result<PendingTurn, ChatError> {
        if self.is_busy() {
            return Err(ChatError::Busy);
        }
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let routed = self.is_unrouted();
        let target = if routed {
            let target = self.classifier.classify(text);
            tracing::info!(session = %self.id, %target, "routed request");
            self.current_context = target;
            target
        } else {
            self.current_context
        };

        let config = context_config(target);
        let context_name = config.map_or(GENERIC_CONTEXT_NAME, |config| config.name);
        let digest = cross_context_digest(&self.store, target, self.digest);
        let capabilities = capabilities_digest(config);

        // snapshot before appending: the new message travels as the current message
        let history: Vec<Message> = self
            .store
            .tail(target, self.history_window)
            .into_iter()
            .cloned()
            .collect();
        self.store.append(Message::user(text, Some(target)));
        if routed {
            self.store
                .append(Message::system(routing_notice(context_name), Some(target)));
        }

        let request = BackendRequest {
            provider: self.provider,
            history,
            current_message: text.to_string(),
            system_instruction: build_system_instruction(
                &self.persona,
                context_name,
                &capabilities,
                &digest,
            ),
        };
        self.in_flight = true;
        Ok(PendingTurn {
            target,
            routed,
            request,
        })
    }

    /// Records the outcome of a pending turn as one system message in its context.
    ///
    /// Failures become the message body so the conversation always continues.
    pub fn finish_turn(
        &mut self,
        pending: PendingTurn,
        outcome: Result<String, ChatError>,
    ) -> Message {
        self.in_flight = false;
        let message = match outcome {
            Ok(raw) => {
                let reply = extract_reply(&raw);
                Message::system_with_chart(reply.text, Some(pending.target), reply.chart)
            }
            Err(error) if error.is_configuration() => {
                tracing::error!(session = %self.id, %error, "provider is not configured");
                Message::system(error.diagnostic(), Some(pending.target))
            }
            Err(error) => {
                tracing::warn!(session = %self.id, %error, "turn failed");
                Message::system(error.diagnostic(), Some(pending.target))
            }
        };
        self.store.append(message.clone());
        tracing::debug!(
            session = %self.id,
            context = %pending.target,
            routed = pending.routed,
            stored = self.store.len(),
            "turn finished"
        );
        message
    }

    /// Runs one full pipeline pass and returns the reply filed in the store.
    ///
    /// Only empty input and re-entry are returned as errors; backend failures
    /// come back as a diagnostic reply. Dropping the returned future releases
    /// the session for the next turn.
    pub async fn submit<B: Backend>(&mut self, backend: &B, input: &str) -> Result<Message, ChatError> {
        let pending = self.begin_turn(input)?;
        let guard = InFlight { session: self };
        let outcome = backend.complete(&pending.request).await;
        Ok(guard.session.finish_turn(pending, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::types::Sender;
    use crate::backends::{HISTORY_WINDOW, Provider, ProviderCall};
    use crate::config::{Config, ProviderConfig};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned outcomes and records every request it receives
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, ChatError>>>,
        seen: Mutex<Vec<BackendRequest>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, ChatError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<BackendRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn complete(&self, request: &BackendRequest) -> Result<String, ChatError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn session() -> Session {
        Session::new(&Config::default())
    }

    #[tokio::test]
    async fn test_unrouted_request_routes_to_discovery() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Ok("## 名单\n1. 优必选".to_string())]);

        let reply = session
            .submit(&backend, "找几家做人形机器人的公司")
            .await
            .unwrap();

        assert_eq!(session.current_context(), ContextId::Discovery);
        let discovery = session.store.filter(ContextId::Discovery);
        assert_eq!(discovery.len(), 3);
        assert_eq!(discovery[0].sender, Sender::User);
        assert_eq!(discovery[0].text, "找几家做人形机器人的公司");
        assert_eq!(discovery[1].sender, Sender::System);
        assert!(discovery[1].text.contains("发现与洞察系统"));
        assert_eq!(discovery[2].id, reply.id);
        assert_eq!(reply.context, Some(ContextId::Discovery));

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.current_message, "找几家做人形机器人的公司");
        assert!(request.system_instruction.contains("- 产业猎手:"));
        assert!(request.system_instruction.contains("（暂无跨模块历史）"));
        // nothing precedes the first message in this context
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_first_routed_gemini_call_starts_with_user_turn() {
        let mut session = session();
        let pending = session.begin_turn("分析低空经济").unwrap();
        let stored: Vec<Sender> = session.store.filter(ContextId::Discovery).iter().map(|m| m.sender).collect();
        assert_eq!(stored, vec![Sender::User, Sender::System]);

        let call = ProviderCall::shape(&pending.request, &ProviderConfig::gemini(), HISTORY_WINDOW);
        let ProviderCall::Gemini(body) = call else {
            panic!("expected a Gemini call");
        };
        assert_eq!(body.contents.len(), 1);
        assert_eq!(body.contents[0].role.as_deref(), Some("user"));
        assert_eq!(body.contents[0].parts[0].text, "分析低空经济");
    }

    #[tokio::test]
    async fn test_follow_up_history_is_chronological() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Ok("规模约千亿".to_string()), Ok("two".to_string())]);
        session.submit(&backend, "分析低空经济").await.unwrap();
        session.submit(&backend, "再细一点").await.unwrap();

        let requests = backend.requests();
        let call = ProviderCall::shape(&requests[1], &ProviderConfig::gemini(), HISTORY_WINDOW);
        let ProviderCall::Gemini(body) = call else {
            panic!("expected a Gemini call");
        };
        let roles: Vec<&str> = body.contents.iter().filter_map(|c| c.role.as_deref()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body.contents[0].parts[0].text, "分析低空经济");
        assert!(body.contents[1].parts[0].text.ends_with("规模约千亿"));
        assert_eq!(body.contents[2].parts[0].text, "再细一点");
    }

    #[test]
    fn test_history_is_windowed_to_recent_messages() {
        let config = Config {
            routing: crate::config::RoutingConfig {
                history_window: 2,
                ..crate::config::RoutingConfig::default()
            },
            ..Config::default()
        };
        let mut session = Session::new(&config);
        for text in ["寻找标的", "再找一些", "继续"] {
            let pending = session.begin_turn(text).unwrap();
            session.finish_turn(pending, Ok(format!("re: {text}")));
        }
        let pending = session.begin_turn("最后一个").unwrap();
        let texts: Vec<&str> = pending.request.history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["继续", "re: 继续"]);
    }

    /// Never answers, like a provider that hangs until the caller gives up
    struct StalledBackend;

    impl Backend for StalledBackend {
        async fn complete(&self, _request: &BackendRequest) -> Result<String, ChatError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_submit_releases_session() {
        let mut session = session();
        let result = tokio::time::timeout(
            Duration::from_millis(10),
            session.submit(&StalledBackend, "寻找标的"),
        )
        .await;
        assert!(result.is_err());
        assert!(!session.is_busy());

        let backend = ScriptedBackend::new(vec![Ok("ok".to_string())]);
        let reply = session.submit(&backend, "再来一个").await.unwrap();
        assert_eq!(reply.text, "ok");
    }

    #[tokio::test]
    async fn test_routed_session_skips_classification() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Ok("one".to_string()), Ok("two".to_string())]);

        session.submit(&backend, "帮我做尽调").await.unwrap();
        assert_eq!(session.current_context(), ContextId::Analysis);

        // execution keywords, but the session is already committed
        session.submit(&backend, "起草一份投资建议书").await.unwrap();
        assert_eq!(session.current_context(), ContextId::Analysis);
        assert_eq!(session.store.filter(ContextId::Analysis).len(), 5);
        assert!(session.store.filter(ContextId::Execution).is_empty());

        let requests = backend.requests();
        let second = &requests[1];
        let texts: Vec<&str> = second.history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "帮我做尽调");
        assert_eq!(texts[2], "one");
    }

    #[tokio::test]
    async fn test_digest_covers_other_contexts() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Ok("a".to_string()), Ok("b".to_string())]);

        session.submit(&backend, "测算DCF模型").await.unwrap();
        session.pin_context(ContextId::Dashboard);
        session.submit(&backend, "起草IC Memo").await.unwrap();
        assert_eq!(session.current_context(), ContextId::Execution);

        let requests = backend.requests();
        let instruction = &requests[1].system_instruction;
        assert!(instruction.contains("[系统:分析与估值系统] 用户: 测算DCF模型"));
        assert!(instruction.contains("[系统:分析与估值系统] 系统: a"));
        assert!(instruction.contains("- 运行模块: 执行与合规系统"));
    }

    #[tokio::test]
    async fn test_chart_reply_is_extracted() {
        let mut session = session();
        let raw = "结论 ```json:chart\n{\"type\":\"radar\",\"title\":\"健康度\",\"data\":[{\"name\":\"偿债\",\"value\":80}]}\n``` 完";
        let backend = ScriptedBackend::new(vec![Ok(raw.to_string())]);

        let reply = session.submit(&backend, "财务健康度诊断").await.unwrap();
        assert_eq!(reply.text, "结论  完");
        let chart = reply.chart_payload().unwrap();
        assert_eq!(chart.title, "健康度");
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_system_message() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Err(ChatError::Configuration {
            provider: Provider::Gemini,
            variable: "API_KEY",
        })]);

        let reply = session.submit(&backend, "监控舆情").await.unwrap();
        assert_eq!(reply.sender, Sender::System);
        assert!(reply.text.starts_with("**Config Error**"));
        assert!(reply.chart.is_none());
        assert_eq!(reply.context, Some(ContextId::Execution));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_empty_reply_is_recorded() {
        let mut session = session();
        let backend = ScriptedBackend::new(vec![Ok(String::new())]);
        let reply = session.submit(&backend, "hello").await.unwrap();
        assert_eq!(reply.text, "");
        assert!(reply.chart.is_none());
    }

    #[test]
    fn test_single_flight_guard() {
        let mut session = session();
        let pending = session.begin_turn("寻找黑马公司").unwrap();
        assert!(session.is_busy());
        assert!(matches!(session.begin_turn("再来一个"), Err(ChatError::Busy)));
        let len_while_busy = session.store.len();

        session.finish_turn(pending, Ok("done".to_string()));
        assert!(!session.is_busy());
        assert_eq!(session.store.len(), len_while_busy + 1);
        assert!(session.begin_turn("再来一个").is_ok());
    }

    #[test]
    fn test_empty_input_rejected_without_side_effects() {
        let mut session = session();
        assert!(matches!(session.begin_turn("   "), Err(ChatError::EmptyMessage)));
        assert!(session.store.is_empty());
        assert!(session.is_unrouted());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_provider_is_carried_into_request() {
        let mut session = session();
        session.set_provider(Provider::DeepSeek);
        let pending = session.begin_turn("分析低空经济").unwrap();
        assert_eq!(pending.request.provider, Provider::DeepSeek);
        assert!(pending.routed);
        assert_eq!(pending.target, ContextId::Discovery);
    }

    #[test]
    fn test_routing_notice_text() {
        assert_eq!(
            routing_notice("执行与合规系统"),
            "**⚡ 智能路由激活：** 已识别您的意图，自动跳转至【执行与合规系统】为您服务。"
        );
    }
}
