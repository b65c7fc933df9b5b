//! 퍼지 문자열 매칭.
//!
//! indel 비율 `2 * LCS / (len a + len b)`를 0-100 점수로 환산한다.
//! 삽입/삭제만 세므로 짧은 질의가 긴 창 제목의 일부와 겹칠 때도 점수가 유지된다.

/// 대소문자를 무시한 유사도 (0.0 ~ 100.0)
///
/// 둘 다 빈 문자열이면 100.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// 최장 공통 부분 수열 길이 (행 두 개만 유지하는 DP)
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// 후보 중 점수가 `threshold` 이상인 최고점 항목
///
/// 동점이면 먼저 나온 후보를 유지한다.
pub fn best_match<'a, T, I>(query: &str, candidates: I, threshold: u8) -> Option<(&'a T, f64)>
where
    I: IntoIterator<Item = (&'a T, &'a str)>,
    T: 'a + ?Sized,
{
    let mut best: Option<(&'a T, f64)> = None;
    for (item, text) in candidates {
        let score = similarity(query, text);
        if score < threshold as f64 {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((item, score));
        }
    }
    best
}
