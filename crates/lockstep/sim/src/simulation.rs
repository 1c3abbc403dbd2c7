//! Randomized multi-client workload against one counter resource.

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use lockstep_client::ClientResource;
use lockstep_master::MasterResource;
use lockstep_store::InMemoryResourceStore;
use lockstep_testkit::{CounterAction, CounterReducer, CounterState, MasterEnv};
use lockstep_types::{CheckedAction, CheckedState, ClientId, ResourceIdentifier};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of one simulation run.
#[derive(Debug, Clone)]
pub struct Report {
    pub actions: usize,
    pub forwards: usize,
    pub mismatches: usize,
    pub resyncs: usize,
    /// Resyncs that actually changed the client's state.
    pub corrections: usize,
    pub public: CheckedState<CounterState>,
    /// Clients whose final state differs from the public state.
    pub diverged: Vec<ClientId>,
}

impl Report {
    pub fn converged(&self) -> bool {
        self.diverged.is_empty()
    }
}

struct SimClient {
    id: ClientId,
    engine: ClientResource<CounterReducer>,
    inbox: Arc<Mutex<Vec<CheckedAction<CounterAction>>>>,
}

fn random_action(rng: &mut StdRng) -> CounterAction {
    match rng.gen_range(0..4) {
        0 => CounterAction::Increment,
        1 => CounterAction::Decrement,
        2 => CounterAction::Change(rng.gen_range(-100..=100)),
        _ => CounterAction::IncrementBy(rng.gen_range(-10..=10)),
    }
}

#[instrument(skip(config), fields(seed = config.simulation.seed))]
pub async fn run(config: &SimConfig) -> SimResult<Report> {
    let settings = &config.simulation;
    if settings.clients == 0 {
        return Err(SimError::Config("at least one client is required".to_string()));
    }

    let rid = ResourceIdentifier::new(&settings.resource_type, &settings.resource_id);
    let master = MasterResource::with_config(
        CounterReducer,
        InMemoryResourceStore::new(),
        config.master.clone(),
    );
    master.create(&rid, CounterState::default()).await?;

    let ids: Vec<ClientId> = (0..settings.clients)
        .map(|n| ClientId::new(format!("client-{n}")))
        .collect();
    let mut env = MasterEnv::new(Arc::new(master), rid, ids.clone());
    let initial = env.get_public().await?;

    let mut clients = Vec::with_capacity(ids.len());
    for id in ids {
        let endpoint = env
            .client(id.as_str())
            .ok_or_else(|| SimError::UnknownClient(id.to_string()))?;
        let engine = ClientResource::new(CounterReducer, initial.clone());
        endpoint.attach(&engine);

        let inbox: Arc<Mutex<Vec<CheckedAction<CounterAction>>>> = Arc::default();
        {
            let inbox = inbox.clone();
            endpoint.on_fwd_action(move |fwd| inbox.lock().push(fwd.clone()));
        }
        clients.push(SimClient { id, engine, inbox });
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let batch_size = settings.batch_size.max(1);
    let mut report = Report {
        actions: 0,
        forwards: 0,
        mismatches: 0,
        resyncs: 0,
        corrections: 0,
        public: initial,
        diverged: Vec::new(),
    };

    let mut remaining = settings.actions;
    while remaining > 0 {
        let batch = batch_size.min(remaining);
        let mut dispatched = vec![false; clients.len()];
        for _ in 0..batch {
            let sender = rng.gen_range(0..clients.len());
            clients[sender].engine.dispatch(random_action(&mut rng));
            dispatched[sender] = true;
        }
        remaining -= batch;
        report.actions += env.settle().await?;

        for (index, client) in clients.iter_mut().enumerate() {
            let forwards = std::mem::take(&mut *client.inbox.lock());
            let mut needs_resync = false;

            for fwd in &forwards {
                report.forwards += 1;
                if let Err(err) = client.engine.reconciliate_action(fwd) {
                    debug!(client = %client.id, kind = err.kind(), "dropping remaining forwards");
                    report.mismatches += 1;
                    needs_resync = true;
                    break;
                }
            }

            // the loopback never acknowledges a sender's own actions, and a
            // later forward can match by coincidence while one of them is
            // still unapplied, so every sender of the batch resyncs
            if needs_resync || dispatched[index] {
                let full = env.resync(&client.id).await?;
                if full.checksum() != client.engine.get().checksum() {
                    report.corrections += 1;
                }
                client.engine.reconciliate_state(full);
                report.resyncs += 1;
            }
        }
    }

    report.public = env.get_public().await?;
    report.diverged = clients
        .iter()
        .filter(|client| client.engine.get() != &report.public)
        .map(|client| client.id.clone())
        .collect();

    if report.converged() {
        info!(
            actions = report.actions,
            mismatches = report.mismatches,
            resyncs = report.resyncs,
            checksum = %report.public.checksum().short(),
            "all clients converged"
        );
    } else {
        warn!(diverged = report.diverged.len(), "clients diverged from the master");
    }

    Ok(report)
}
