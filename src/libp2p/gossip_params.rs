// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use libp2p::gossipsub::{PeerScoreParams, PeerScoreThresholds, TopicScoreParams};

use super::service::{blocks_topic, messages_topic};

/// Seconds between blocks; scoring decays are expressed against it.
const BLOCK_TIME: Duration = Duration::from_secs(30);

/// Tunable gossip scoring knobs. The values here are defaults; callers can
/// override any of them before the service is built.
#[derive(Debug, Clone)]
pub struct GossipParams {
    /// Weight of the blocks topic in a peer's score.
    pub block_topic_weight: f64,
    /// Weight of the messages topic in a peer's score.
    pub message_topic_weight: f64,
    /// Upper bound for the aggregate topic contribution.
    pub topic_score_cap: f64,
    /// Decay applied to accumulated behaviour penalties per refresh.
    pub behaviour_penalty_decay: f64,
    /// Peers scoring below this are ignored for gossip.
    pub gossip_threshold: f64,
}

impl Default for GossipParams {
    fn default() -> Self {
        Self {
            block_topic_weight: 0.5,
            message_topic_weight: 0.1,
            topic_score_cap: 100.0,
            behaviour_penalty_decay: score_parameter_decay(BLOCK_TIME * 10),
            gossip_threshold: -100.0,
        }
    }
}

impl GossipParams {
    /// Builds the peer score parameters for the two chain topics.
    pub fn build_peer_score_params(&self, network_name: &str) -> PeerScoreParams {
        let mut params = PeerScoreParams {
            topic_score_cap: self.topic_score_cap,
            behaviour_penalty_decay: self.behaviour_penalty_decay,
            behaviour_penalty_weight: -10.0,
            behaviour_penalty_threshold: 6.0,
            decay_interval: Duration::from_secs(1),
            ..Default::default()
        };

        let mut block_topic = TopicScoreParams {
            topic_weight: self.block_topic_weight,
            time_in_mesh_weight: 0.024,
            time_in_mesh_quantum: Duration::from_secs(6),
            time_in_mesh_cap: 1.0,
            first_message_deliveries_weight: 5.0,
            first_message_deliveries_decay: score_parameter_decay(BLOCK_TIME * 100),
            first_message_deliveries_cap: 100.0,
            ..Default::default()
        };
        // Invalid blocks are heavily penalized regardless of topic weight.
        block_topic.invalid_message_deliveries_weight = -1000.0;
        block_topic.invalid_message_deliveries_decay = score_parameter_decay(BLOCK_TIME * 100);

        let mut msg_topic = TopicScoreParams {
            topic_weight: self.message_topic_weight,
            time_in_mesh_weight: 0.002_778,
            time_in_mesh_quantum: Duration::from_secs(6),
            time_in_mesh_cap: 1.0,
            first_message_deliveries_weight: 0.5,
            first_message_deliveries_decay: score_parameter_decay(BLOCK_TIME * 10),
            first_message_deliveries_cap: 100.0,
            ..Default::default()
        };
        msg_topic.invalid_message_deliveries_weight = -1000.0;
        msg_topic.invalid_message_deliveries_decay = score_parameter_decay(BLOCK_TIME * 100);

        params
            .topics
            .insert(blocks_topic(network_name).hash(), block_topic);
        params
            .topics
            .insert(messages_topic(network_name).hash(), msg_topic);

        params
    }

    /// Builds the peer score thresholds gating gossip participation.
    pub fn build_peer_score_threshold(&self) -> PeerScoreThresholds {
        PeerScoreThresholds {
            gossip_threshold: self.gossip_threshold,
            publish_threshold: -1000.0,
            graylist_threshold: -2500.0,
            accept_px_threshold: 1000.0,
            opportunistic_graft_threshold: 3.5,
        }
    }
}

/// Decay factor such that a unit score halves over the given period, with
/// score refreshes every second.
fn score_parameter_decay(decay: Duration) -> f64 {
    let ticks = decay.as_secs_f64();
    0.5f64.powf(1.0 / ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_carry_both_topics() {
        let gp = GossipParams::default();
        let params = gp.build_peer_score_params("calibnet");
        assert_eq!(params.topics.len(), 2);
        assert_eq!(params.topic_score_cap, 100.0);
    }

    #[test]
    fn decay_halves_over_period() {
        let decay = score_parameter_decay(Duration::from_secs(300));
        let after: f64 = (0..300).fold(1.0, |acc, _| acc * decay);
        assert!((after - 0.5).abs() < 1e-9);
    }
}
