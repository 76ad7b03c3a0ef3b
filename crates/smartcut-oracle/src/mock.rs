use crate::reply::{Oracle, OracleError, OracleReply};
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = Result<OracleReply, OracleError>;

/// Test double that replays canned replies.
///
/// Routed replies are matched by substring against the prompt, so concurrent
/// batches get deterministic answers regardless of completion order. Prompts
/// matching no route consume the default queue; when that is empty the call
/// fails with a transport error.
pub struct ScriptedOracle {
    default: Mutex<VecDeque<Scripted>>,
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            default: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: OracleReply) {
        self.default.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_text(&self, text: &str) {
        self.push_reply(OracleReply::Text(text.to_string()));
    }

    pub fn push_error(&self, err: OracleError) {
        self.default.lock().unwrap().push_back(Err(err));
    }

    /// Answer prompts containing `needle` with `text`, once per call queued.
    pub fn route_text(&self, needle: &str, text: &str) {
        self.route(needle, Ok(OracleReply::Text(text.to_string())));
    }

    pub fn route_error(&self, needle: &str, err: OracleError) {
        self.route(needle, Err(err));
    }

    fn route(&self, needle: &str, reply: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(n, _)| n == needle) {
            Some((_, queue)) => queue.push_back(reply),
            None => routes.push((needle.to_string(), VecDeque::from([reply]))),
        }
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<OracleReply, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        {
            let mut routes = self.routes.lock().unwrap();
            if let Some((_, queue)) = routes
                .iter_mut()
                .find(|(needle, queue)| !queue.is_empty() && prompt.contains(needle.as_str()))
            {
                if let Some(next) = queue.pop_front() {
                    return next;
                }
            }
        }

        self.default
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("no scripted reply left".into())))
    }
}
