use divan::{bench, black_box_drop, Bencher};
use itertools::iproduct;
use std::time::Duration;
use underpool::{Call, Pool};

const WORKERS: &[usize] = &[1, 4, 8];
const NUM_TASKS: &[usize] = &[100, 1_000, 10_000];

const AMPLE: Option<Duration> = Some(Duration::from_secs(5));

fn main() {
    divan::main();
}

#[bench(args = iproduct!(WORKERS, NUM_TASKS))]
fn bench_short_task(bencher: Bencher, (num_workers, num_tasks): (&usize, &usize)) {
    bencher.bench_local(|| {
        let mut pool =
            Pool::new(Call::from(|x: u64| x.wrapping_mul(x)), *num_workers, AMPLE).unwrap();
        pool.push_all(0..*num_tasks as u64);
        let mut received = 0;
        while received < *num_tasks {
            if pool.pull().is_some() {
                received += 1;
            }
        }
        black_box_drop(received);
    })
}

#[bench(args = WORKERS)]
fn bench_long_task(bencher: Bencher, num_workers: &usize) {
    bencher.bench_local(|| {
        let mut pool = Pool::new(
            Call::from(|x: u64| {
                std::thread::sleep(Duration::from_micros(100));
                x
            }),
            *num_workers,
            AMPLE,
        )
        .unwrap();
        pool.push_all(0..64u64);
        let mut received = 0;
        while received < 64 {
            if pool.pull().is_some() {
                received += 1;
            }
        }
        black_box_drop(received);
    })
}
