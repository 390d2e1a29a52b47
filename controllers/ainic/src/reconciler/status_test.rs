//! Unit tests for status aggregation

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::status::*;
    use crate::test_utils::create_test_daemon_set;
    use chrono::{TimeZone, Utc};
    use cluster_client::ClusterError;
    use crds::{AINICCondition, AINICPhase, AINICStatus, ConditionStatus, READY_CONDITION};

    #[test]
    fn test_aggregate_table() {
        let cases = [
            (0, 0, AINICPhase::Pending, "Waiting for AINIC driver to be scheduled"),
            (3, 0, AINICPhase::Pending, "Waiting for AINIC driver to be scheduled"),
            (0, 2, AINICPhase::Pending, "Waiting for AINIC driver to be scheduled"),
            (5, 3, AINICPhase::Progressing, "AINIC driver ready on 3/5 nodes"),
            (5, 5, AINICPhase::Ready, "All nodes are ready with AINIC driver"),
            (1, 1, AINICPhase::Ready, "All nodes are ready with AINIC driver"),
            (2, 4, AINICPhase::Progressing, "AINIC driver ready on 4/2 nodes"),
        ];

        for (desired, ready, phase, message) in cases {
            assert_eq!(
                aggregate(desired, ready),
                (phase, message.to_string()),
                "desired={} ready={}",
                desired,
                ready
            );
        }
    }

    #[test]
    fn test_aggregate_clamps_negative_counts() {
        assert_eq!(aggregate(-1, -1).0, AINICPhase::Pending);
        assert_eq!(aggregate(4, -2).0, AINICPhase::Pending);
        assert_eq!(aggregate(-4, 2).0, AINICPhase::Pending);
    }

    #[test]
    fn test_ready_condition_follows_phase() {
        let ready = ready_condition(AINICPhase::Ready, 5, 5);
        assert_eq!(ready.r#type, READY_CONDITION);
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason.as_deref(), Some("AllNodesReady"));
        assert_eq!(ready.message.as_deref(), Some("All nodes have AINIC driver ready"));

        for phase in [AINICPhase::Pending, AINICPhase::Progressing] {
            let not_ready = ready_condition(phase, 2, 5);
            assert_eq!(not_ready.status, ConditionStatus::False);
            assert_eq!(not_ready.reason.as_deref(), Some("NotAllNodesReady"));
            assert_eq!(not_ready.message.as_deref(), Some("AINIC driver ready on 2/5 nodes"));
        }
    }

    #[test]
    fn test_observe_from_daemon_set_counters() {
        let status = observe(None, &create_test_daemon_set(5, 3));

        assert_eq!(status.phase, AINICPhase::Progressing);
        assert_eq!(status.nodes_total, 5);
        assert_eq!(status.nodes_ready, 3);
        assert_eq!(status.message, "AINIC driver ready on 3/5 nodes");
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, ConditionStatus::False);
    }

    #[test]
    fn test_observe_without_daemon_set_status() {
        let status = observe(None, &Default::default());

        assert_eq!(status.phase, AINICPhase::Pending);
        assert_eq!(status.nodes_total, 0);
        assert_eq!(status.nodes_ready, 0);
    }

    #[test]
    fn test_observe_preserves_other_conditions_and_transition_time() {
        let since = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let previous = AINICStatus {
            conditions: vec![
                AINICCondition {
                    r#type: "Degraded".to_string(),
                    status: ConditionStatus::False,
                    last_transition_time: Some(since),
                    reason: None,
                    message: None,
                },
                AINICCondition {
                    r#type: READY_CONDITION.to_string(),
                    status: ConditionStatus::True,
                    last_transition_time: Some(since),
                    reason: Some("AllNodesReady".to_string()),
                    message: Some("All nodes have AINIC driver ready".to_string()),
                },
            ],
            ..Default::default()
        };

        let status = observe(Some(&previous), &create_test_daemon_set(2, 2));

        assert_eq!(status.conditions.len(), 2);
        assert_eq!(status.conditions[0].r#type, "Degraded");
        assert_eq!(status.conditions[1].last_transition_time, Some(since));
        assert_eq!(status.phase, AINICPhase::Ready);

        let status = observe(Some(&status), &create_test_daemon_set(3, 2));
        assert_eq!(status.conditions[1].status, ConditionStatus::False);
        assert_ne!(status.conditions[1].last_transition_time, Some(since));
    }

    #[test]
    fn test_failed_keeps_counters() {
        let previous = observe(None, &create_test_daemon_set(4, 4));
        let error = ControllerError::Cluster(ClusterError::Api("quota exceeded".to_string()));

        let status = failed(Some(&previous), &error);

        assert_eq!(status.phase, AINICPhase::Failed);
        assert_eq!(
            status.message,
            "Failed to reconcile DaemonSet: Cluster error: API error: quota exceeded"
        );
        assert_eq!(status.nodes_ready, 4);
        assert_eq!(status.conditions, previous.conditions);
    }
}
