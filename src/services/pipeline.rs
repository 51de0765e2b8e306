//! Stage composition.
//!
//! A pipeline is a base [`Develop`] action wrapped by an ordered list of
//! [`Stage`]s. The first stage is outermost: its logic runs first and it
//! decides whether, and with what task, the rest of the chain runs.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, Work, WorkingMemory};
use crate::domain::ports::Judge;

/// A callable develop action: `(task, memory) -> work`.
#[async_trait]
pub trait Develop: Send + Sync {
    async fn develop(&self, task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work>;
}

/// One wrapping stage.
///
/// A stage that never calls `next` short-circuits everything below it.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work>;
}

/// A stage bound to the action it wraps.
struct Wrapped {
    stage: Arc<dyn Stage>,
    next: Arc<dyn Develop>,
}

#[async_trait]
impl Develop for Wrapped {
    async fn develop(&self, task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work> {
        self.stage.run(task, memory, self.next.as_ref()).await
    }
}

/// Compose `base` with `stages`, first stage outermost.
///
/// `None` entries are dropped before composition, so disabled stages never
/// appear in the chain. An empty list returns `base` itself.
pub fn compose<I>(base: Arc<dyn Develop>, stages: I) -> Arc<dyn Develop>
where
    I: IntoIterator<Item = Option<Arc<dyn Stage>>>,
{
    let active: Vec<Arc<dyn Stage>> = stages.into_iter().flatten().collect();
    active.into_iter().rev().fold(base, |next, stage| {
        Arc::new(Wrapped { stage, next }) as Arc<dyn Develop>
    })
}

/// Several stages grouped into one.
///
/// `compose(base, [a, chain([b, c])])` behaves exactly like
/// `compose(base, [a, b, c])`.
#[derive(Clone, Default)]
pub struct StageChain {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageChain {
    pub fn new<I>(stages: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<dyn Stage>>>,
    {
        Self {
            stages: stages.into_iter().flatten().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap into a composable stage entry.
    pub fn into_stage(self) -> Option<Arc<dyn Stage>> {
        Some(Arc::new(self))
    }
}

/// The remainder of a chain in front of its tail action.
struct ChainLink<'a> {
    rest: &'a [Arc<dyn Stage>],
    tail: &'a dyn Develop,
}

#[async_trait]
impl Develop for ChainLink<'_> {
    async fn develop(&self, task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work> {
        match self.rest.split_first() {
            None => self.tail.develop(task, memory).await,
            Some((first, rest)) => {
                let link = ChainLink {
                    rest,
                    tail: self.tail,
                };
                first.run(task, memory, &link).await
            }
        }
    }
}

#[async_trait]
impl Stage for StageChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn run(
        &self,
        task: &Task,
        memory: &mut WorkingMemory,
        next: &dyn Develop,
    ) -> DomainResult<Work> {
        let link = ChainLink {
            rest: &self.stages,
            tail: next,
        };
        link.develop(task, memory).await
    }
}

/// Default production action: hand the task's prompt to the judge.
pub struct JudgeDevelop {
    judge: Arc<dyn Judge>,
}

impl JudgeDevelop {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Develop for JudgeDevelop {
    #[instrument(skip(self, task, memory))]
    async fn develop(&self, task: &Task, memory: &mut WorkingMemory) -> DomainResult<Work> {
        let normalized = task.normalize();
        let context = memory.to_context(&normalized, []);
        let output = self.judge.judge(&normalized.prompt, context).await?;
        Ok(Work::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Develop for Recorder {
        async fn develop(&self, _task: &Task, _memory: &mut WorkingMemory) -> DomainResult<Work> {
            self.log.lock().unwrap().push("base".to_string());
            Ok(Work::new(json!("done")))
        }
    }

    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        call_next: bool,
    }

    #[async_trait]
    impl Stage for Tag {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(
            &self,
            task: &Task,
            memory: &mut WorkingMemory,
            next: &dyn Develop,
        ) -> DomainResult<Work> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.call_next {
                next.develop(task, memory).await
            } else {
                Ok(Work::new(json!(self.name)))
            }
        }
    }

    fn tag(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Option<Arc<dyn Stage>> {
        Some(Arc::new(Tag {
            name,
            log: log.clone(),
            call_next: true,
        }))
    }

    #[tokio::test]
    async fn test_empty_stage_list_is_base() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let develop = compose(Arc::new(Recorder { log: log.clone() }), Vec::new());
        let work = develop
            .develop(&Task::from("t"), &mut WorkingMemory::new())
            .await
            .unwrap();
        assert_eq!(work.output, json!("done"));
        assert_eq!(*log.lock().unwrap(), vec!["base"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stop: Option<Arc<dyn Stage>> = Some(Arc::new(Tag {
            name: "stop",
            log: log.clone(),
            call_next: false,
        }));
        let develop = compose(
            Arc::new(Recorder { log: log.clone() }),
            vec![tag("a", &log), stop, tag("c", &log)],
        );
        let work = develop
            .develop(&Task::from("t"), &mut WorkingMemory::new())
            .await
            .unwrap();
        assert_eq!(work.output, json!("stop"));
        assert_eq!(*log.lock().unwrap(), vec!["a", "stop"]);
    }

    #[tokio::test]
    async fn test_empty_chain_passes_through() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let develop = compose(
            Arc::new(Recorder { log: log.clone() }),
            vec![StageChain::default().into_stage(), tag("a", &log)],
        );
        develop
            .develop(&Task::from("t"), &mut WorkingMemory::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "base"]);
    }
}
