use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nebras::core::greeting::GreetingClassifier;
use nebras::core::message::Message;
use nebras::core::prompt::PromptBuilder;

const INPUTS: &[&str] = &[
    "hello",
    "Hey there Nebras!!",
    "what's up?",
    "thanks so much",
    "I have had a persistent dry cough for about two weeks, should I worry?",
    "Can I take ibuprofen and paracetamol together for a headache?",
];

fn make_history(n_pairs: usize, base: &str) -> Vec<Message> {
    let mut history = Vec::with_capacity(n_pairs * 2);
    for i in 0..n_pairs {
        history.push(Message::user(format!("{base} #{i}")));
        history.push(Message::assistant(format!("Answer to {base} #{i}")));
    }
    history
}

fn bench_classify(c: &mut Criterion) {
    let classifier = GreetingClassifier::default();
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(INPUTS.len() as u64));
    group.bench_function("mixed_inputs", |b| {
        b.iter(|| {
            for input in INPUTS {
                std::hint::black_box(classifier.classify(std::hint::black_box(input)));
            }
        })
    });
    group.finish();
}

fn bench_prompt(c: &mut Criterion) {
    let builder = PromptBuilder::default();
    let mut group = c.benchmark_group("prompt_build");
    for pairs in [0usize, 3, 50, 500] {
        let history = make_history(pairs, "My knee hurts when I climb stairs");
        group.bench_function(BenchmarkId::new("history_pairs", pairs), |b| {
            b.iter(|| {
                std::hint::black_box(builder.build(
                    std::hint::black_box(&history),
                    "Should I see a physiotherapist?",
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_prompt);
criterion_main!(benches);
