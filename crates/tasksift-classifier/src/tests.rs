//! Integration tests for the adaptive batch classifier

#[cfg(test)]
mod tests {
    use crate::{
        merge_results, AdaptiveBatchClassifier, BatchOutcome, ClassifierConfig, PromptBuilder,
        ValidationFailure,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tasksift_domain::traits::{Classifier, ClassifyRequest};
    use tasksift_domain::Item;
    use tasksift_llm::{echo_response, LlmError, MockClassifier};

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item::new(format!("{:02}", i), format!("Task {}", i)))
            .collect()
    }

    fn config(batch_size: usize, min_batch: usize) -> ClassifierConfig {
        ClassifierConfig {
            batch_size,
            min_batch,
            ..Default::default()
        }
    }

    fn ids(results: &[tasksift_domain::ClassificationResult]) -> Vec<String> {
        results.iter().map(|r| r.id.clone()).collect()
    }

    /// Malformed whenever the batch holds a poisoned item
    fn poisoned(marker: &'static str) -> MockClassifier {
        MockClassifier::with_handler(move |request| {
            if request.items.iter().any(|i| i.title == marker) {
                Ok("{\"results\": [ {\"id\": ".to_string())
            } else {
                Ok(echo_response(request))
            }
        })
    }

    #[tokio::test]
    async fn test_split_until_batches_validate() {
        let mock = MockClassifier::failing_above(3);
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(10, 2)).unwrap();

        let run = classifier.classify(&items(10)).await;

        assert_eq!(ids(&run.results), ids_of(&items(10)));
        assert!(run.is_complete());

        let mut sizes = mock.call_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 2, 3, 3, 5, 5, 10]);

        // Only batches of three or fewer validated
        for audit in &run.audits {
            match audit.outcome {
                BatchOutcome::Validated => assert!(audit.size <= 3),
                BatchOutcome::Split => assert!(audit.size > 3),
                BatchOutcome::Salvaged => panic!("unexpected salvage: {:?}", audit),
            }
        }
        assert_eq!(run.splits(), 3);
    }

    fn ids_of(items: &[Item]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_salvage_floor_returns_empty_without_failing() {
        let mock = MockClassifier::always_malformed();
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(5, 5)).unwrap();

        let run = classifier.classify(&items(5)).await;

        assert!(run.results.is_empty());
        assert_eq!(mock.call_count(), 1);
        assert_eq!(run.salvaged(), 1);
        assert_eq!(run.lost_items(), 5);
        assert!(!run.is_complete());
        assert_eq!(run.audits[0].failure, Some(ValidationFailure::NoStructuredData));
    }

    #[tokio::test]
    async fn test_salvaged_batch_does_not_affect_siblings() {
        let mut input = items(10);
        input[2].title = "poison".to_string();
        let classifier = AdaptiveBatchClassifier::new(poisoned("poison"), config(5, 5)).unwrap();

        let run = classifier.classify(&input).await;

        assert_eq!(ids(&run.results), ids_of(&input[5..]));
        assert_eq!(run.batches, 2);
        assert_eq!(run.salvaged(), 1);
    }

    #[tokio::test]
    async fn test_bisection_isolates_single_bad_item() {
        let mut input = items(8);
        input[5].title = "poison".to_string();
        let classifier = AdaptiveBatchClassifier::new(poisoned("poison"), config(8, 1)).unwrap();

        let run = classifier.classify(&input).await;

        let mut expected = ids_of(&input);
        expected.remove(5);
        assert_eq!(ids(&run.results), expected);
        assert_eq!(run.salvaged(), 1);
        assert_eq!(run.lost_items(), 1);
    }

    #[tokio::test]
    async fn test_string_typed_effort_validates_first_time() {
        let mock = MockClassifier::with_handler(|request| {
            let entries: Vec<serde_json::Value> = request
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let effort = if i == 0 { serde_json::json!("30") } else { serde_json::json!(15) };
                    serde_json::json!({"id": item.id, "category": "Drafting", "effort_minutes": effort})
                })
                .collect();
            Ok(serde_json::json!({ "results": entries }).to_string())
        });
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(8, 1)).unwrap();

        let run = classifier.classify(&items(8)).await;

        assert_eq!(mock.call_sizes(), vec![8]);
        assert_eq!(run.splits(), 0);
        assert!(run.is_complete());
        assert_eq!(ids(&run.results), ids_of(&items(8)));
        assert_eq!(run.results[0].effort_minutes, Some(30.0));
    }

    #[tokio::test]
    async fn test_reordered_ids_follow_input_position() {
        let mock = MockClassifier::with_handler(|request| {
            let mut reversed = request.clone();
            reversed.items.reverse();
            Ok(echo_response(&reversed))
        });
        let classifier = AdaptiveBatchClassifier::new(mock, config(4, 1)).unwrap();

        let run = classifier.classify(&items(4)).await;
        let merged = merge_results(run.results.clone());

        assert!(run.is_complete());
        assert_eq!(ids(&run.results), ids_of(&items(4)));
        assert_eq!(merged.len(), 4);
        assert!(merged.results.contains_key("00"));
    }

    #[tokio::test]
    async fn test_salvage_accepts_short_array_at_floor() {
        let mock = MockClassifier::with_handler(|request| {
            let mut short = request.clone();
            short.items.pop();
            Ok(echo_response(&short))
        });
        let classifier = AdaptiveBatchClassifier::new(mock, config(3, 3)).unwrap();

        let run = classifier.classify(&items(3)).await;

        assert_eq!(ids(&run.results), vec!["00", "01"]);
        assert_eq!(
            run.audits[0].failure,
            Some(ValidationFailure::CountMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(run.audits[0].recovered, 2);
    }

    #[tokio::test]
    async fn test_min_batch_equal_to_len_goes_straight_to_salvage() {
        let mock = MockClassifier::always_malformed();
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(4, 4)).unwrap();

        classifier.classify(&items(4)).await;

        assert_eq!(mock.call_sizes(), vec![4]);
    }

    #[tokio::test]
    async fn test_single_item_never_splits() {
        let mock = MockClassifier::always_malformed();
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(1, 1)).unwrap();

        let run = classifier.classify(&items(3)).await;

        assert_eq!(mock.call_sizes(), vec![1, 1, 1]);
        assert_eq!(run.salvaged(), 3);
        assert_eq!(run.splits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_validation_failure() {
        let mock = MockClassifier::echo().with_delay(Duration::from_secs(700));
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(4, 1)).unwrap();

        let run = classifier.classify(&items(4)).await;

        assert!(run.results.is_empty());
        // 4 → 2 + 2 → 1 + 1 + 1 + 1
        assert_eq!(mock.call_count(), 7);
        assert!(run
            .audits
            .iter()
            .all(|a| a.failure == Some(ValidationFailure::Timeout { limit_secs: 600 })));
        assert!(run.audits.iter().all(|a| a.raw_response.is_none()));
    }

    #[tokio::test]
    async fn test_classifier_errors_are_absorbed() {
        let classifier =
            AdaptiveBatchClassifier::new(MockClassifier::always_error(), config(3, 1)).unwrap();

        let run = classifier.classify(&items(3)).await;

        assert!(run.results.is_empty());
        assert_eq!(run.salvaged(), 3);
        assert!(matches!(
            run.audits[0].failure,
            Some(ValidationFailure::Classifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_depth_cap_stops_splitting() {
        let mock = MockClassifier::always_malformed();
        let config = ClassifierConfig {
            max_split_depth: 1,
            ..config(8, 1)
        };
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config).unwrap();

        let run = classifier.classify(&items(8)).await;

        let mut sizes = mock.call_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 4, 8]);
        assert_eq!(run.salvaged(), 2);
    }

    #[tokio::test]
    async fn test_batches_preserve_input_order() {
        let classifier =
            AdaptiveBatchClassifier::new(MockClassifier::echo(), config(10, 2)).unwrap();
        let input = items(25);

        let run = classifier.classify(&input).await;

        assert_eq!(run.batches, 3);
        assert_eq!(ids(&run.results), ids_of(&input));
        let starts: Vec<_> = run.audits.iter().map(|a| a.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn test_every_call_is_audited_with_raw_response() {
        let mock = MockClassifier::failing_above(3);
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(6, 1)).unwrap();

        let run = classifier.classify(&items(6)).await;

        assert_eq!(run.audits.len(), mock.call_count());
        assert!(run.audits.iter().all(|a| a.raw_response.is_some()));
        assert_eq!(run.audits[0].size, 6);
        assert_eq!(run.audits[0].outcome, BatchOutcome::Split);
        assert_eq!(run.audits[0].item_ids.len(), 6);
    }

    #[tokio::test]
    async fn test_classify_batch_ignores_batch_size() {
        let mock = MockClassifier::echo();
        let classifier = AdaptiveBatchClassifier::new(mock.clone(), config(2, 1)).unwrap();

        let run = classifier.classify_batch(&items(5)).await;

        assert_eq!(mock.call_sizes(), vec![5]);
        assert_eq!(run.results.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mock = MockClassifier::echo();
        let classifier =
            AdaptiveBatchClassifier::new(mock.clone(), ClassifierConfig::default()).unwrap();

        let run = classifier.classify(&[]).await;

        assert!(run.results.is_empty());
        assert_eq!(mock.call_count(), 0);
        assert!(run.is_complete());
    }

    #[tokio::test]
    async fn test_prompt_carries_expected_count() {
        let mock = MockClassifier::with_handler(|request| {
            let expected = format!("exactly {} entries", request.expected_count());
            if request.instructions.contains(&expected) && request.instructions.contains("House rules") {
                Ok(echo_response(request))
            } else {
                Err(LlmError::Other("instructions missing".to_string()))
            }
        });
        let classifier = AdaptiveBatchClassifier::new(mock, config(4, 1))
            .unwrap()
            .with_prompt(PromptBuilder::new().with_instructions("House rules"));

        let run = classifier.classify(&items(7)).await;

        assert!(run.is_complete());
        assert_eq!(run.results.len(), 7);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AdaptiveBatchClassifier::new(MockClassifier::echo(), config(10, 0));
        assert!(result.is_err());
    }

    struct CountingClassifier {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Classifier for CountingClassifier {
        type Error = LlmError;

        async fn submit(&self, request: &ClassifyRequest) -> Result<String, Self::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(echo_response(request))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_calls_are_bounded() {
        let counting = Arc::new(CountingClassifier {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let config = ClassifierConfig {
            max_in_flight: 3,
            ..config(2, 1)
        };
        let classifier = AdaptiveBatchClassifier::from_arc(Arc::clone(&counting), config).unwrap();

        let run = classifier.classify(&items(20)).await;

        assert_eq!(run.results.len(), 20);
        assert_eq!(counting.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_results_merge_after_classification() {
        let mut input = items(4);
        input.push(Item::new("01", "Duplicate of 01"));
        let classifier =
            AdaptiveBatchClassifier::new(MockClassifier::echo(), config(10, 1)).unwrap();

        let run = classifier.classify(&input).await;
        let merged = merge_results(run.results);

        assert_eq!(merged.len(), 4);
        assert_eq!(merged.dropped, 0);
    }
}
