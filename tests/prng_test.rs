use rand::{RngCore, SeedableRng};
use sen::prng::{perlin, PrngState};

#[test]
fn same_seed_same_sequence() {
    let mut a = PrngState::new(3421);
    let mut b = PrngState::new(3421);
    for _ in 0..100 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
}

#[test]
fn different_seeds_diverge() {
    let mut a = PrngState::new(1);
    let mut b = PrngState::new(2);
    let diverged = (0..10).any(|_| a.next_u64() != b.next_u64());
    assert!(diverged);
}

#[test]
fn next_f32_is_a_unit_float() {
    let mut prng = PrngState::new(99);
    for _ in 0..1000 {
        let f = prng.next_f32();
        assert!((0.0..1.0).contains(&f), "{}", f);
    }
}

#[test]
fn f32_range_respects_bounds() {
    let mut prng = PrngState::new(7);
    for _ in 0..1000 {
        let f = prng.f32_range(-5.0, 5.0);
        assert!((-5.0..5.0).contains(&f), "{}", f);
    }
}

#[test]
fn i32_range_is_inclusive_and_covers() {
    let mut prng = PrngState::new(13);
    let mut seen = [false; 5];
    for _ in 0..500 {
        let i = prng.i32_range(0, 4);
        assert!((0..=4).contains(&i), "{}", i);
        seen[i as usize] = true;
    }
    assert!(seen.iter().all(|s| *s));
}

#[test]
fn f32_around_clamps_to_the_span() {
    let mut prng = PrngState::new(21);
    for _ in 0..200 {
        let f = prng.f32_around(50.0, 10.0, 0.0, 200.0);
        // 10% of the 0..200 span is 20 either side
        assert!((30.0..=70.0).contains(&f), "{}", f);
    }
}

#[test]
fn state_words_resume_the_stream() {
    let mut prng = PrngState::new(55);
    prng.next_u64();
    prng.next_u64();

    let mut resumed = PrngState::from_state_words(prng.state_words());
    for _ in 0..10 {
        assert_eq!(prng.next_u64(), resumed.next_u64());
    }
}

#[test]
fn seedable_rng_matches_new() {
    let mut a = PrngState::new(1234);
    let mut b = PrngState::seed_from_u64(1234);
    assert_eq!(a.next_u64(), b.next_u64());
}

#[test]
fn zero_seed_still_produces_values() {
    let mut prng = PrngState::new(0);
    let first = prng.next_u64();
    let second = prng.next_u64();
    assert_ne!(first, second);
}

#[test]
fn perlin_is_deterministic_and_bounded() {
    let a = perlin(0.4, 1.7, 2.9);
    let b = perlin(0.4, 1.7, 2.9);
    assert_eq!(a, b);

    for i in 0..100 {
        let t = i as f32 * 0.137;
        let v = perlin(t, t * 0.5, t * 0.25);
        assert!(v.abs() <= 1.0, "{}", v);
    }
}

#[test]
fn perlin_is_zero_on_the_lattice() {
    assert_eq!(perlin(0.0, 0.0, 0.0), 0.0);
    assert_eq!(perlin(1.0, 2.0, 3.0), 0.0);
}
