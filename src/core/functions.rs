use crate::core::{collect_pages, FunctionAdmin};
use crate::domain::model::{FunctionSummary, InvokeOutcome};
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct InvokeReport {
    pub outcome: InvokeOutcome,
    /// 回應內容，JSON 會排版後輸出
    pub rendered_payload: String,
}

pub async fn list_functions<F: FunctionAdmin>(admin: &F) -> Result<Vec<FunctionSummary>> {
    let mut functions =
        collect_pages(None, move |marker| admin.list_functions_page(marker)).await?;
    functions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(functions)
}

pub async fn show_function<F: FunctionAdmin>(admin: &F, name: &str) -> Result<FunctionSummary> {
    admin.get_function(name).await
}

pub fn render_payload(payload: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}

/// Synchronous invoke. The payload must be valid JSON.
pub async fn invoke_function<F: FunctionAdmin>(
    admin: &F,
    name: &str,
    payload: &str,
) -> Result<InvokeReport> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    let outcome = admin.invoke(name, serde_json::to_vec(&value)?).await?;

    if let Some(error) = &outcome.function_error {
        tracing::warn!("⚠️ {} returned a function error: {}", name, error);
    } else {
        tracing::info!("✅ {} answered with status {}", name, outcome.status_code);
    }

    let rendered_payload = render_payload(&outcome.payload);
    Ok(InvokeReport {
        outcome,
        rendered_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CodeSource, Page};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoFunctions {
        invoked_with: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl FunctionAdmin for EchoFunctions {
        async fn list_functions_page(
            &self,
            marker: Option<String>,
        ) -> Result<Page<FunctionSummary, String>> {
            let named = |name: &str| FunctionSummary {
                name: name.to_string(),
                ..FunctionSummary::default()
            };
            Ok(match marker.as_deref() {
                None => Page {
                    items: vec![named("sender"), named("bounce-sweep")],
                    next: Some("m1".to_string()),
                },
                Some(_) => Page::last(vec![named("api-handler")]),
            })
        }

        async fn get_function(&self, name: &str) -> Result<FunctionSummary> {
            Ok(FunctionSummary {
                name: name.to_string(),
                ..FunctionSummary::default()
            })
        }

        async fn update_code(&self, _name: &str, _code: CodeSource) -> Result<FunctionSummary> {
            unreachable!()
        }

        async fn invoke(&self, _name: &str, payload: Vec<u8>) -> Result<InvokeOutcome> {
            self.invoked_with.lock().unwrap().push(payload.clone());
            Ok(InvokeOutcome {
                status_code: 200,
                function_error: None,
                executed_version: Some("$LATEST".to_string()),
                payload,
            })
        }
    }

    fn admin() -> EchoFunctions {
        EchoFunctions {
            invoked_with: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_list_functions_sorted_across_pages() {
        let functions = list_functions(&admin()).await.unwrap();
        let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["api-handler", "bounce-sweep", "sender"]);
    }

    #[tokio::test]
    async fn test_invoke_renders_json_payload() {
        let admin = admin();

        let report = invoke_function(&admin, "sender", r#"{"campaign_id":"c1"}"#)
            .await
            .unwrap();

        assert_eq!(report.outcome.status_code, 200);
        assert_eq!(report.rendered_payload, "{\n  \"campaign_id\": \"c1\"\n}");
        assert_eq!(admin.invoked_with.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_rejects_invalid_payload() {
        let admin = admin();

        assert!(invoke_function(&admin, "sender", "{not json").await.is_err());
        assert!(admin.invoked_with.lock().unwrap().is_empty());
    }

    #[test]
    fn test_render_non_json_payload() {
        assert_eq!(render_payload(b"plain text"), "plain text");
    }
}
