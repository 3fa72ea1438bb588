use crate::client::SimulationParams;
use crate::trace::{Basis, Bit, RoleRecord, Trace};
use rand::rngs::StdRng;
use rand::{rng, Rng, SeedableRng};

/// Generates a lossless offline exchange for demos and tests: no service
/// round trip, every photon detected. With an interceptor the usual
/// measure-and-resend disturbance applies, so mismatched interception shows
/// up in the error rate exactly like a live run.
pub fn generate_sample_trace(step_count: u32, with_interceptor: bool) -> (Trace, SimulationParams) {
    let mut rng = rng();
    sample_trace_with(&mut rng, step_count, with_interceptor)
}

/// Seeded variant for reproducible fixtures.
pub fn generate_sample_trace_seeded(
    step_count: u32,
    with_interceptor: bool,
    seed: u64,
) -> (Trace, SimulationParams) {
    let mut rng = StdRng::seed_from_u64(seed);
    sample_trace_with(&mut rng, step_count, with_interceptor)
}

fn sample_trace_with(
    rng: &mut impl Rng,
    step_count: u32,
    with_interceptor: bool,
) -> (Trace, SimulationParams) {
    let n = step_count as usize;
    let mut alice_bits = Vec::with_capacity(n);
    let mut alice_bases = Vec::with_capacity(n);
    let mut eve_bits = vec![None; n];
    let mut eve_bases = vec![None; n];
    let mut bob_bits = Vec::with_capacity(n);
    let mut bob_bases = Vec::with_capacity(n);

    for step in 0..n {
        let a_bit = random_bit(rng);
        let a_basis = random_basis(rng);
        let b_basis = random_basis(rng);

        let arriving_bit;
        let arriving_basis;
        if with_interceptor {
            let e_basis = random_basis(rng);
            let e_bit = measure(rng, a_bit, a_basis, e_basis);
            eve_bits[step] = Some(e_bit);
            eve_bases[step] = Some(e_basis);
            arriving_bit = e_bit;
            arriving_basis = e_basis;
        } else {
            arriving_bit = a_bit;
            arriving_basis = a_basis;
        }
        let b_bit = measure(rng, arriving_bit, arriving_basis, b_basis);

        alice_bits.push(a_bit);
        alice_bases.push(a_basis);
        bob_bits.push(Some(b_bit));
        bob_bases.push(Some(b_basis));
    }

    let mut sifted_key = Vec::new();
    let mut matching = 0u32;
    let mut errors = 0u32;
    for step in 0..n {
        if alice_bases[step] != bob_bases[step].expect("every sample photon is measured") {
            continue;
        }
        matching += 1;
        let b_bit = bob_bits[step].expect("every sample photon is measured");
        if alice_bits[step] == b_bit {
            // The sifted key keeps only the agreeing matching-bases bits;
            // disagreements count toward the error rate instead.
            sifted_key.push(b_bit);
        } else {
            errors += 1;
        }
    }
    let error_rate = if matching == 0 {
        0.0
    } else {
        f64::from(errors) / f64::from(matching)
    };

    let alice = RoleRecord {
        bits: alice_bits.into_iter().map(Some).collect(),
        bases: alice_bases.into_iter().map(Some).collect(),
    };
    let eve = RoleRecord {
        bits: eve_bits,
        bases: eve_bases,
    };
    let bob = RoleRecord {
        bits: bob_bits,
        bases: bob_bases,
    };
    let trace = Trace::new(alice, eve, bob, sifted_key, matching, error_rate)
        .expect("sample construction keeps every sequence aligned");

    let params = SimulationParams {
        bit_count: step_count,
        eve_mode: with_interceptor,
        ..SimulationParams::default()
    };
    (trace, params)
}

fn random_bit(rng: &mut impl Rng) -> Bit {
    if rng.random::<bool>() {
        Bit::One
    } else {
        Bit::Zero
    }
}

fn random_basis(rng: &mut impl Rng) -> Basis {
    if rng.random::<bool>() {
        Basis::Diagonal
    } else {
        Basis::Rectilinear
    }
}

/// Projective measurement on an ideal channel: the same basis reproduces
/// the prepared bit, a mismatched basis yields a coin flip.
fn measure(rng: &mut impl Rng, bit: Bit, prepared_in: Basis, measured_in: Basis) -> Bit {
    if prepared_in == measured_in {
        bit
    } else {
        random_bit(rng)
    }
}
