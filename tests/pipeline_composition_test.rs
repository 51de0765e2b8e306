//! Stage composition: ordering, omission and grouping.

use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};

use devloop::domain::errors::DomainResult;
use devloop::domain::models::{Task, Work, WorkingMemory};
use devloop::services::{compose, Develop, Stage, StageChain};

type Trace = Arc<Mutex<Vec<String>>>;

/// Records its name on the way in and on the way out.
struct Probe {
    name: String,
    trace: Trace,
}

#[async_trait]
impl Stage for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        self.trace.lock().unwrap().push(format!("{}>", self.name));
        memory.set_extension(self.name.clone(), json!(true));
        let work = next.develop(task, memory).await?;
        self.trace.lock().unwrap().push(format!("<{}", self.name));
        Ok(work)
    }
}

struct Base {
    trace: Trace,
}

#[async_trait]
impl Develop for Base {
    async fn develop(&self, _task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work> {
        self.trace.lock().unwrap().push("base".to_string());
        Ok(Work::new(json!(memory.extensions.len())))
    }
}

fn probe(name: &str, trace: &Trace) -> Option<Arc<dyn Stage>> {
    Some(Arc::new(Probe {
        name: name.to_string(),
        trace: trace.clone(),
    }))
}

async fn run(develop: Arc<dyn Develop>) -> Work {
    develop
        .develop(&Task::from("ship it"), &mut WorkingMemory::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_stage_is_outermost() {
    let trace = Trace::default();
    let develop = compose(
        Arc::new(Base { trace: trace.clone() }),
        vec![probe("a", &trace), probe("b", &trace), probe("c", &trace)],
    );

    let work = run(develop).await;

    assert_eq!(
        *trace.lock().unwrap(),
        vec!["a>", "b>", "c>", "base", "<c", "<b", "<a"]
    );
    assert_eq!(work.output, json!(3));
}

#[tokio::test]
async fn test_disabled_entries_are_omitted() {
    let trace = Trace::default();
    let develop = compose(
        Arc::new(Base { trace: trace.clone() }),
        vec![None, probe("a", &trace), None, probe("c", &trace), None],
    );

    run(develop).await;

    assert_eq!(*trace.lock().unwrap(), vec!["a>", "c>", "base", "<c", "<a"]);
}

#[tokio::test]
async fn test_chain_is_associative() {
    let flat_trace = Trace::default();
    let flat = compose(
        Arc::new(Base {
            trace: flat_trace.clone(),
        }),
        vec![
            probe("a", &flat_trace),
            probe("b", &flat_trace),
            probe("c", &flat_trace),
        ],
    );

    let nested_trace = Trace::default();
    let inner = StageChain::new(vec![probe("b", &nested_trace), probe("c", &nested_trace)]);
    assert_eq!(inner.len(), 2);
    let nested = compose(
        Arc::new(Base {
            trace: nested_trace.clone(),
        }),
        vec![probe("a", &nested_trace), inner.into_stage()],
    );

    assert_eq!(run(flat).await, run(nested).await);
    assert_eq!(*flat_trace.lock().unwrap(), *nested_trace.lock().unwrap());
}

proptest! {
    #[test]
    fn prop_composition_keeps_enabled_order(enabled in proptest::collection::vec(any::<bool>(), 0..8)) {
        let trace = Trace::default();
        let stages: Vec<Option<Arc<dyn Stage>>> = enabled
            .iter()
            .enumerate()
            .map(|(i, on)| if *on { probe(&format!("s{i}"), &trace) } else { None })
            .collect();
        let develop = compose(Arc::new(Base { trace: trace.clone() }), stages);

        tokio_test::block_on(run(develop));

        let expected_in: Vec<String> = enabled
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| format!("s{i}>"))
            .collect();
        let recorded = trace.lock().unwrap().clone();
        prop_assert_eq!(&recorded[..expected_in.len()], &expected_in[..]);
        prop_assert_eq!(recorded[expected_in.len()].as_str(), "base");
        prop_assert_eq!(recorded.len(), expected_in.len() * 2 + 1);
    }
}
