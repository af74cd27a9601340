use crate::client::GlossaryClient;
use crate::config::LoadTestConfig;
use crate::profile::{
    ActionPicker, GLOSSARY_USER, READ_ONLY_USER, UserProfile, assign_profiles, perform,
};
use crate::stats::EventSink;
use rand::{SeedableRng, rngs::StdRng};
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tonic::transport::Endpoint;

/// Starts `config.users` simulated users, one every `config.spawn_interval`,
/// and waits until all of them have stopped. Users stop when `cancel` fires.
pub async fn run_users(config: &LoadTestConfig, sink: EventSink, cancel: CancellationToken) {
    let profiles = assign_profiles(
        config.users,
        &[
            (&GLOSSARY_USER, config.glossary_weight),
            (&READ_ONLY_USER, config.read_only_weight),
        ],
    );

    let mut users = JoinSet::new();
    let mut ticker = interval(config.spawn_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for (id, profile) in profiles.into_iter().enumerate() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => StdRng::from_os_rng(),
        };
        users.spawn(simulate_user(
            id,
            profile,
            config.endpoint.clone(),
            sink.clone(),
            rng,
            cancel.clone(),
        ));
        tracing::debug!(user = id, profile = profile.name, "user spawned");
    }
    tracing::info!(users = users.len(), "all users spawned");
    drop(sink);

    while let Some(res) = users.join_next().await {
        if let Err(e) = res {
            tracing::error!("user task failed: {e}");
        }
    }
}

async fn simulate_user(
    id: usize,
    profile: &'static UserProfile,
    endpoint: Endpoint,
    sink: EventSink,
    mut rng: StdRng,
    cancel: CancellationToken,
) {
    let picker = match ActionPicker::new(profile) {
        Ok(picker) => picker,
        Err(e) => {
            tracing::error!(user = id, profile = profile.name, "invalid profile: {e}");
            return;
        }
    };

    let mut client = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        res = GlossaryClient::connect(endpoint) => match res {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(user = id, "failed to connect: {e}");
                return;
            }
        },
    };

    loop {
        let action = picker.pick(&mut rng);
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = perform(&mut client, action, &mut rng) => event,
        };
        sink.fire(event).await;

        let wait = picker.wait_time(&mut rng);
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
    }
    tracing::debug!(user = id, "user stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::spawn_seeded_server;
    use crate::stats::spawn_collector;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn users_run_until_cancelled() {
        let (endpoint, _stop) = spawn_seeded_server().await;
        let config = LoadTestConfig {
            endpoint,
            users: 4,
            spawn_interval: Duration::from_millis(10),
            run_time: Duration::from_secs(1),
            glossary_weight: 1,
            read_only_weight: 1,
            seed: Some(42),
        };

        let cancel = CancellationToken::new();
        let stopper = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                cancel.cancel();
            })
        };

        let (sink, collector) = spawn_collector(64);
        tokio::time::timeout(
            Duration::from_secs(10),
            run_users(&config, sink, cancel.clone()),
        )
        .await
        .expect("users did not stop after cancellation");
        stopper.await.unwrap();

        // Every user fires its first request before its first wait.
        let stats = tokio::time::timeout(Duration::from_secs(5), collector)
            .await
            .expect("collector did not finish")
            .unwrap();
        assert!(stats.total_requests() >= 4, "{stats}");
    }

    #[tokio::test]
    async fn cancelled_before_start_spawns_nobody() {
        let (endpoint, _stop) = spawn_seeded_server().await;
        let config = LoadTestConfig {
            endpoint,
            users: 3,
            spawn_interval: Duration::from_millis(10),
            run_time: Duration::from_secs(1),
            glossary_weight: 1,
            read_only_weight: 0,
            seed: None,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (sink, collector) = spawn_collector(8);
        run_users(&config, sink, cancel).await;
        assert_eq!(collector.await.unwrap().total_requests(), 0);
    }
}
