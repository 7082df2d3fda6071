use rand::Rng;

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RUNES_CANDIDATE_ID_FOUNDATION: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890+/";

const LOCAL_UFRAG_LENGTH: usize = 16;
const LOCAL_PWD_LENGTH: usize = 32;

pub fn generate_rand_string(length: usize, runes: &[u8]) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| runes[rng.gen_range(0..runes.len())] as char)
        .collect()
}

/// generate_ufrag returns a random string for the ICE username fragment.
pub fn generate_ufrag() -> String {
    generate_rand_string(LOCAL_UFRAG_LENGTH, RUNES_ALPHA)
}

/// generate_pwd returns a random string for the ICE password.
pub fn generate_pwd() -> String {
    generate_rand_string(LOCAL_PWD_LENGTH, RUNES_ALPHA)
}

/// generate_cand_id returns a random candidate id.
pub fn generate_cand_id() -> String {
    format!(
        "candidate:{}",
        generate_rand_string(32, RUNES_CANDIDATE_ID_FOUNDATION)
    )
}

/// generate_tie_breaker returns the agent's 64-bit role tie-breaker.
pub fn generate_tie_breaker() -> u64 {
    rand::thread_rng().gen::<u64>()
}
