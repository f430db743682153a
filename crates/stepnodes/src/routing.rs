use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use stepcore::{Step, StepError, StepId};
use stepruntime::{ConfigField, FieldRule, Router, StepKind, StepMetadata};

#[derive(Debug, Deserialize)]
struct MatchConfig {
    #[serde(default)]
    rules: Vec<RuleConfig>,
    #[serde(default)]
    fallback: Option<StepId>,
}

#[derive(Debug, Deserialize)]
struct RuleConfig {
    pointer: String,
    #[serde(default, deserialize_with = "present")]
    equals: Option<Value>,
    target: StepId,
}

/// `"equals": null` compares against null; only an absent key means truthy
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Router configured from a list of pointer rules.
///
/// ```json
/// {
///   "rules": [
///     {"pointer": "/results/AnalyzeTicket/escalate", "target": "EscalateTicket"},
///     {"pointer": "/results/AnalyzeTicket/intent", "equals": "billing/invoice", "target": "ProcessInvoice"}
///   ],
///   "fallback": "GenerateResponse"
/// }
/// ```
pub struct MatchRouterKind;

impl StepKind for MatchRouterKind {
    fn kind(&self) -> &str {
        "router.match"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let config: MatchConfig = serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| StepError::Configuration(format!("router.match: {}", e)))?;

        let mut router = Router::new(id.clone());
        for rule in config.rules {
            router = match rule.equals {
                Some(expected) => router.rule(FieldRule::equals(rule.pointer, expected, rule.target)),
                None => router.rule(FieldRule::truthy(rule.pointer, rule.target)),
            };
        }
        if let Some(fallback) = config.fallback {
            router = router.fallback(fallback);
        }

        Ok(Box::new(router))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Route on values in the run state, first match wins".to_string(),
            category: "routing".to_string(),
            config: vec![
                ConfigField::optional("rules", "Ordered list of {pointer, equals?, target}"),
                ConfigField::optional("fallback", "Step to use when no rule matches"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepcore::{Event, RunState};

    fn build(config: Value) -> Result<Box<dyn Step>, StepError> {
        MatchRouterKind.build(&StepId::from("TicketRouter"), config.as_object().unwrap())
    }

    #[tokio::test]
    async fn test_configured_rules_in_order() {
        let router = build(json!({
            "rules": [
                {"pointer": "/event/escalate", "target": "EscalateTicket"},
                {"pointer": "/event/intent", "equals": "billing/invoice", "target": "ProcessInvoice"}
            ],
            "fallback": "GenerateResponse"
        }))
        .unwrap();

        let cases = [
            (json!({"escalate": true, "intent": "billing/invoice"}), "EscalateTicket"),
            (json!({"intent": "billing/invoice"}), "ProcessInvoice"),
            (json!({"intent": "general/question"}), "GenerateResponse"),
        ];

        for (payload, expected) in cases {
            let state = router
                .process(RunState::new(Event::new(payload)))
                .await
                .unwrap();
            assert_eq!(state.result("TicketRouter"), Some(&json!({"next_node": expected})));
        }
    }

    #[tokio::test]
    async fn test_equals_null_is_not_a_truthy_rule() {
        let router = build(json!({
            "rules": [{"pointer": "/event/assignee", "equals": null, "target": "AssignTicket"}],
            "fallback": "GenerateResponse"
        }))
        .unwrap();

        let unassigned = router
            .process(RunState::new(Event::new(json!({"assignee": null}))))
            .await
            .unwrap();
        assert_eq!(
            unassigned.result("TicketRouter"),
            Some(&json!({"next_node": "AssignTicket"}))
        );

        let assigned = router
            .process(RunState::new(Event::new(json!({"assignee": "dana"}))))
            .await
            .unwrap();
        assert_eq!(
            assigned.result("TicketRouter"),
            Some(&json!({"next_node": "GenerateResponse"}))
        );
    }

    #[test]
    fn test_invalid_rule_config() {
        let err = build(json!({"rules": [{"pointer": "/event/x"}]})).err().unwrap();
        assert!(matches!(err, StepError::Configuration(_)));
    }
}
