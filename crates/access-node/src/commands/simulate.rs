//! `simulate`: run the built-in request scenarios against an in-memory store
//! with one enrolled template. Touches neither the configured database nor
//! the spool directory.

use std::sync::Arc;

use bq_02_identity_store::{EnrolledTemplate, InMemoryAuditSpool, InMemoryIdentityStore};
use bq_04_request_protocol::{encode_query_frame, parse_response, ResponseToken};
use bq_05_query_orchestrator::QueryOrchestrator;
use shared_types::{FingerPosition, IdentityId, TemplateId, TransportOrigin};
use tracing::info;

use crate::config::NodeConfig;
use crate::container::AccessContainer;
use crate::{CommandError, ExitStatus};

/// Template enrolled for the simulation (32 bytes).
const SIM_TEMPLATE: [u8; 32] = [
    0x03, 0x01, 0x5d, 0x1e, 0x00, 0x00, 0xff, 0xfe, 0xf8, 0x1e, 0xe0, 0x06, 0xc0, 0x02, 0x80,
    0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x01,
];

const SIM_IDENTITY: IdentityId = IdentityId(1001);

/// One scripted request and the answer it must get.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub frame: Vec<u8>,
    pub expected: ResponseToken,
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub name: &'static str,
    pub response: String,
    pub passed: bool,
}

pub fn scenarios() -> Vec<Scenario> {
    let mut stranger = SIM_TEMPLATE;
    for byte in stranger.iter_mut() {
        *byte = !*byte;
    }
    vec![
        Scenario {
            name: "enrolled finger",
            frame: encode_query_frame(&SIM_TEMPLATE, FingerPosition::IndexRight).into_bytes(),
            expected: ResponseToken::Yes,
        },
        Scenario {
            name: "wrong finger",
            frame: encode_query_frame(&SIM_TEMPLATE, FingerPosition::IndexLeft).into_bytes(),
            expected: ResponseToken::No,
        },
        Scenario {
            name: "unknown template",
            frame: encode_query_frame(&stranger, FingerPosition::IndexRight).into_bytes(),
            expected: ResponseToken::No,
        },
        Scenario {
            name: "invalid finger",
            frame: b"QUERY:AAAAAAAAAAA=:toe_left".to_vec(),
            expected: ResponseToken::Error,
        },
        Scenario {
            name: "empty template",
            frame: b"QUERY::index_right".to_vec(),
            expected: ResponseToken::Error,
        },
        Scenario {
            name: "invalid base64",
            frame: b"QUERY:@@not base64@@:index_right".to_vec(),
            expected: ResponseToken::Error,
        },
        Scenario {
            name: "malformed frame",
            frame: b"HELLO".to_vec(),
            expected: ResponseToken::Error,
        },
    ]
}

pub async fn run(config: NodeConfig) -> Result<ExitStatus, CommandError> {
    let orchestrator = simulation_orchestrator(config)?;
    let results = run_scenarios(&orchestrator).await;

    for result in &results {
        let verdict = if result.passed { "ok" } else { "FAILED" };
        println!("{:<18} {:<8} {verdict}", result.name, result.response);
    }
    let failed = results.iter().filter(|r| !r.passed).count();
    println!("{} scenarios, {failed} failed", results.len());

    if failed == 0 {
        Ok(ExitStatus::Success)
    } else {
        Ok(ExitStatus::Error)
    }
}

/// An orchestrator over a one-template in-memory store and spool, using the
/// configured matching and codec settings.
pub fn simulation_orchestrator(config: NodeConfig) -> Result<QueryOrchestrator, CommandError> {
    let store = InMemoryIdentityStore::with_enrolled(vec![EnrolledTemplate {
        identity_id: SIM_IDENTITY,
        template_id: TemplateId(1),
        finger: FingerPosition::IndexRight,
        template: SIM_TEMPLATE.to_vec(),
    }]);
    let spool = InMemoryAuditSpool::new(config.audit.max_spooled);
    let container = AccessContainer::from_parts(config, Arc::new(store), Arc::new(spool))
        .map_err(CommandError::Startup)?;
    Ok(container.orchestrator)
}

pub async fn run_scenarios(orchestrator: &QueryOrchestrator) -> Vec<ScenarioResult> {
    let mut results = Vec::new();
    for scenario in scenarios() {
        let outcome = orchestrator
            .handle_frame(&scenario.frame, TransportOrigin::Cli)
            .await;
        let response = String::from_utf8_lossy(&outcome.response)
            .trim_end()
            .to_string();
        let passed = parse_response(&outcome.response)
            .map(|parsed| parsed.token == scenario.expected)
            .unwrap_or(false);
        info!(
            scenario = scenario.name,
            reason = %outcome.decision.reason(),
            passed,
            "simulated request"
        );
        results.push(ScenarioResult {
            name: scenario.name,
            response,
            passed,
        });
    }
    orchestrator.audit_pipeline().flush().await;
    results
}
