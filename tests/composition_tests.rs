use quickcheck::{quickcheck, TestResult};
use rs2_compose::*;
use tokio_test::{assert_ok, block_on};

fn collect<T: Send + 'static, P: Policy>(stream: Stream<T, P>) -> Vec<T> {
    assert_ok!(block_on(stream.to_list()))
}

fn interleaved_expectation(a: &[i32], b: &[i32]) -> Vec<i32> {
    let mut expected = Vec::with_capacity(a.len() + b.len());
    for i in 0..a.len().max(b.len()) {
        expected.extend(a.get(i));
        expected.extend(b.get(i));
    }
    expected
}

// ================================
// Laws
// ================================

quickcheck! {
    fn prop_serial_is_associative(a: Vec<i32>, b: Vec<i32>, c: Vec<i32>) -> bool {
        let left: SerialStream<i32> = serial(
            from_list(a.clone()),
            serial(from_list(b.clone()), from_list(c.clone())),
        );
        let right: SerialStream<i32> = serial(
            serial(from_list(a.clone()), from_list(b.clone())),
            from_list(c.clone()),
        );
        let left = collect(left);
        left == collect(right) && left == [a, b, c].concat()
    }

    fn prop_empty_is_serial_identity(a: Vec<i32>) -> bool {
        let left: SerialStream<i32> = serial(empty(), from_list(a.clone()));
        let right: SerialStream<i32> = serial(from_list(a.clone()), empty());
        collect(left) == a && collect(right) == a
    }

    fn prop_interleave_alternates_then_keeps_leftovers(a: Vec<i32>, b: Vec<i32>) -> bool {
        let s: InterleavedStream<i32> = interleave(from_list(a.clone()), from_list(b.clone()));
        collect(s) == interleaved_expectation(&a, &b)
    }

    fn prop_zip_pairs_up_to_the_shorter_side(a: Vec<u8>, b: Vec<u16>) -> TestResult {
        if a.len() > 200 || b.len() > 200 {
            return TestResult::discard();
        }
        let s: ZipSerialStream<(u8, u16)> = from_list(a.clone()).zip(from_list(b.clone()));
        let expected: Vec<(u8, u16)> = a.into_iter().zip(b).collect();
        TestResult::from_bool(collect(s) == expected)
    }
}

// ================================
// Scenarios
// ================================

#[tokio::test]
async fn test_serial_append_of_lists() {
    let s: SerialStream<i32> = serial(from_list(vec![1, 2, 3]), from_list(vec![4, 5]));
    assert_eq!(s.to_list().await.unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_interleave_of_lists() {
    let s: SerialStream<i32> = interleave(from_list(vec![1, 2]), from_list(vec![3, 4]));
    assert_eq!(s.to_list().await.unwrap(), vec![1, 3, 2, 4]);
}

#[tokio::test]
async fn test_nested_loops_under_serial_and_interleaved() {
    fn pairs<P: Monadic>() -> Stream<(i32, i32), P> {
        each(vec![1, 2]).bind(|x| each(vec![3, 4]).map(move |y| (x, y)))
    }

    assert_eq!(
        pairs::<Serial>().to_list().await.unwrap(),
        vec![(1, 3), (1, 4), (2, 3), (2, 4)]
    );
    assert_eq!(
        pairs::<Interleaved>().to_list().await.unwrap(),
        vec![(1, 3), (2, 3), (1, 4), (2, 4)]
    );
}

// ================================
// One program, four interpretations
// ================================

fn program<P: Monadic>() -> Stream<u32, P> {
    each(1..=3u32).bind(|x| {
        each(1..=2u32).map_m(move |y| async move {
            tokio::task::yield_now().await;
            Ok(x * 10 + y)
        })
    })
}

fn branch_of(value: u32) -> u32 {
    value / 10
}

fn assert_branch_order(values: &[u32]) {
    for branch in 1..=3 {
        let seen: Vec<u32> = values.iter().copied().filter(|v| branch_of(*v) == branch).collect();
        assert_eq!(seen, vec![branch * 10 + 1, branch * 10 + 2], "branch {} out of order", branch);
    }
}

#[tokio::test]
async fn test_program_under_every_policy() {
    assert_eq!(program::<Serial>().to_list().await.unwrap(), vec![11, 12, 21, 22, 31, 32]);
    assert_eq!(program::<Interleaved>().to_list().await.unwrap(), vec![11, 21, 12, 31, 22, 32]);

    for values in [
        program::<Async>().to_list().await.unwrap(),
        program::<Parallel>().to_list().await.unwrap(),
    ] {
        assert_eq!(values.len(), 6);
        assert_branch_order(&values);
        let mut sorted = values.clone();
        sorted.sort();
        assert_eq!(sorted, vec![11, 12, 21, 22, 31, 32]);
    }
}

#[tokio::test]
async fn test_adapters_change_only_composition() {
    let base: SerialStream<i32> = from_list(vec![1, 2]);
    let fair = base.as_interleaved().append(from_list(vec![3, 4]));
    assert_eq!(fair.policy(), PolicyKind::Interleaved);
    assert_eq!(fair.as_serial().to_list().await.unwrap(), vec![1, 3, 2, 4]);
}

#[tokio::test]
async fn test_fold_with_async_append_runs_every_stream() {
    let streams: Vec<AsyncStream<i32>> = (0..5).map(|n| from_list(vec![n * 2, n * 2 + 1])).collect();
    let mut values = fold_with(async_append, streams).to_list().await.unwrap();
    values.sort();
    assert_eq!(values, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_constructors() {
    let squares: SerialStream<u64> = unfoldr(1u64, |n| (n <= 4).then(|| (n * n, n + 1)));
    assert_eq!(squares.to_list().await.unwrap(), vec![1, 4, 9, 16]);

    let powers: SerialStream<u64> = iterate(1u64, |n| n * 2).take(5);
    assert_eq!(powers.to_list().await.unwrap(), vec![1, 2, 4, 8, 16]);

    let replicated: SerialStream<&str> = replicate_m(3, || async { Ok("tick") });
    assert_eq!(replicated.length().await.unwrap(), 3);

    let prefixed: SerialStream<i32> = cons(async { Ok(0) }, once(1));
    assert_eq!(prefixed.to_list().await.unwrap(), vec![0, 1]);

    let from_futures: SerialStream<i32> = from_futures_stream(tokio_stream::iter(vec![7, 8]));
    assert_eq!(from_futures.sum().await.unwrap(), 15);

    let countdown: SerialStream<u32> = unfoldr_m(3u32, |n| async move { Ok((n > 0).then(|| (n, n - 1))) });
    assert_eq!(countdown.to_list().await.unwrap(), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_policy_chosen_at_runtime() {
    let kind: PolicyKind = serde_json::from_str("\"Interleaved\"").unwrap();
    let a = AnyStream::new(from_list::<_, Serial>(vec![1, 2])).adapt(kind);
    let b = AnyStream::new(from_list::<_, Serial>(vec![3, 4])).adapt(kind);
    assert_eq!(a.try_append(b).unwrap().to_list().await.unwrap(), vec![1, 3, 2, 4]);

    let a = AnyStream::new(from_list::<_, Serial>(vec![1]));
    let b = AnyStream::new(from_list::<_, Parallel>(vec![2]));
    assert!(matches!(
        a.try_append(b),
        Err(StreamError::PolicyMismatch {
            expected: PolicyKind::Serial,
            found: PolicyKind::Parallel
        })
    ));
}
