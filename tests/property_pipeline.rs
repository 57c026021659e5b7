//! Universal properties of the pipeline stages and the workflow machine.

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use shieldwall::adapters::execution::SimulatedExecutionBackend;
use shieldwall::domain::models::{
    Action, ComposerConfig, EvaluatorConfig, ExecutorConfig, Severity, Signal,
    Threat, Verdict, WorkflowEvent, WorkflowState,
};
use shieldwall::services::{
    ActionComposer, ActionExecutor, EntityCatalog, ThreatEvaluator, Transition, WorkflowMachine,
};

const PROTOCOLS: &[&str] = &["Uniswap", "Aave", "Curve"];
const TOKENS: &[&str] = &["USDC", "USDT", "DAI", "WETH"];

fn catalog() -> Arc<EntityCatalog> {
    Arc::new(common::catalog())
}

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("exploit".to_string()),
        Just("hacked".to_string()),
        Just("critical".to_string()),
        Just("arbitrum".to_string()),
        Just(String::new()),
        prop::sample::select(PROTOCOLS).prop_map(str::to_string),
        prop::sample::select(TOKENS).prop_map(str::to_lowercase),
        "[a-zA-Z]{1,10}",
    ]
}

fn content() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 0..12).prop_map(|words| words.join(" "))
}

fn action() -> impl Strategy<Value = Action> {
    (
        prop::sample::select(PROTOCOLS),
        prop::sample::select(TOKENS),
        0u8..3,
    )
        .prop_map(|(protocol, token, kind)| match kind {
            0 => Action::withdraw(protocol, token),
            1 => Action::swap(protocol, token, "USDC"),
            _ => Action::revoke(protocol, token),
        })
}

proptest! {
    /// A verdict is benign, a threat with its threat, or an error; never a mix.
    #[test]
    fn prop_verdicts_are_exclusive(text in content()) {
        let evaluator = ThreatEvaluator::new(catalog(), &EvaluatorConfig::default());
        let verdict = tokio_test::block_on(evaluator.evaluate(&Signal::tweet(text.clone())));

        match &verdict {
            Verdict::Benign => prop_assert!(verdict.threat().is_none() && verdict.error().is_none()),
            Verdict::Threat { threat } => {
                prop_assert!(verdict.error().is_none());
                prop_assert!(!threat.affected_protocols.is_empty());
                prop_assert!(!threat.affected_tokens.is_empty());
            }
            Verdict::Error { .. } => {
                prop_assert!(text.trim().is_empty());
                prop_assert!(!verdict.is_threat());
            }
        }
    }

    /// Normalizing a canonical name returns it unchanged, in any input casing.
    #[test]
    fn prop_normalization_is_idempotent(
        protocol in prop::sample::select(PROTOCOLS),
        token in prop::sample::select(TOKENS),
        upper in any::<bool>(),
    ) {
        let catalog = catalog();
        let cased = |s: &str| if upper { s.to_uppercase() } else { s.to_lowercase() };

        let canonical = catalog.normalize_protocol(&cased(protocol)).unwrap().to_string();
        prop_assert_eq!(canonical.as_str(), protocol);
        prop_assert_eq!(catalog.normalize_protocol(&canonical), Some(protocol));

        let canonical = catalog.normalize_token(&cased(token)).unwrap().to_string();
        prop_assert_eq!(canonical.as_str(), token);
        prop_assert_eq!(catalog.normalize_token(&canonical), Some(token));
    }

    /// With no affected protocols the fallback plan is empty.
    #[test]
    fn prop_no_protocols_no_actions(
        tokens in prop::collection::btree_set(prop::sample::select(TOKENS), 0..4),
    ) {
        let catalog = catalog();
        let composer = ActionComposer::new(Arc::clone(&catalog), &ComposerConfig::default());
        let threat = Threat::new("noise", Severity::Low).with_tokens(tokens);

        let plan = tokio_test::block_on(composer.compose(&threat, catalog.dependency_graph()));
        prop_assert!(plan.is_empty());
    }

    /// One result per action, in input order, whatever the backend does.
    #[test]
    fn prop_execute_all_preserves_length_and_order(
        actions in prop::collection::vec(action(), 0..8),
        rejected in prop::sample::select(TOKENS),
        down in any::<bool>(),
    ) {
        let results = tokio_test::block_on(async {
            let backend = Arc::new(SimulatedExecutionBackend::new());
            backend.reject("Aave", rejected).await;
            backend.set_down(down);
            let executor = ActionExecutor::new(backend, &ExecutorConfig::default());
            executor.execute_all(&actions).await
        });

        prop_assert_eq!(results.len(), actions.len());
        for (result, action) in results.iter().zip(&actions) {
            prop_assert_eq!(&result.action, action);
            prop_assert!(result.tx_ref().is_some() != result.error().is_some());
            if down {
                prop_assert!(!result.is_success());
            } else if action.protocol == "Aave" && action.token == rejected {
                prop_assert!(!result.is_success());
            } else {
                prop_assert!(result.is_success());
            }
        }
    }

    /// From idle a signal always starts evaluation and adds one history entry.
    #[test]
    fn prop_signal_from_idle_starts_evaluation(
        earlier in prop::collection::vec(content(), 0..5),
        text in content(),
    ) {
        let mut machine = WorkflowMachine::new(100);
        for content in earlier {
            machine.apply(WorkflowEvent::SignalReceived(Signal::tweet(content))).unwrap();
            machine.apply(WorkflowEvent::EvaluationSettled(Verdict::Benign)).unwrap();
        }
        prop_assert_eq!(machine.state(), WorkflowState::Idle);
        let before = machine.context().signal_history.len();

        let signal = Signal::tweet(text);
        let transition = machine.apply(WorkflowEvent::SignalReceived(signal.clone())).unwrap();

        prop_assert_eq!(
            transition,
            Transition::Moved { from: WorkflowState::Idle, to: WorkflowState::Evaluating }
        );
        prop_assert_eq!(machine.context().signal_history.len(), before + 1);
        prop_assert_eq!(machine.context().signal_history.last(), Some(&signal));
        prop_assert_eq!(machine.context().current_signal.as_ref(), Some(&signal));
    }
}
