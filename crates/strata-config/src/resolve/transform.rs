//! Substitution transforms: `random:` and `dist100:`.

use crate::error::ValidationError;
use crate::result::ConfigResult;
use rand::Rng;

const RANDOM_PREFIX: &str = "random:";
const DIST_PREFIX: &str = "dist100:";

/// Apply a transform invocation, or return `None` when `key` is a plain
/// configuration path.
pub(crate) fn apply(key: &str, path: &str) -> Option<ConfigResult<String>> {
    if let Some(kind) = key.strip_prefix(RANDOM_PREFIX) {
        Some(random_value(kind, path))
    } else if let Some(spec) = key.strip_prefix(DIST_PREFIX) {
        Some(dist100(spec, path))
    } else {
        None
    }
}

/// Produce a fresh random value of the requested primitive kind.
///
/// Each evaluation draws from a thread-local generator, so concurrent
/// readers never share state.
fn random_value(kind: &str, path: &str) -> ConfigResult<String> {
    let mut rng = rand::rng();
    let rendered = match kind {
        "int" => rng.random::<i32>().to_string(),
        "long" => rng.random::<i64>().to_string(),
        "float" => rng.random::<f32>().to_string(),
        "double" => rng.random::<f64>().to_string(),
        "bool" => rng.random::<bool>().to_string(),
        "char" => rng.random_range('a'..='z').to_string(),
        other => {
            // Ranged form: int(min,max), inclusive on both ends.
            if let Some(result) = ranged_int(other, &mut rng) {
                match result {
                    Ok(value) => value,
                    Err(reason) => {
                        return ConfigResult::err(ValidationError::decode(path, reason));
                    }
                }
            } else {
                return ConfigResult::err(ValidationError::decode(
                    path,
                    format!("unknown random kind '{other}'"),
                ));
            }
        }
    };
    ConfigResult::ok(rendered)
}

fn ranged_int(kind: &str, rng: &mut impl Rng) -> Option<Result<String, String>> {
    let body = kind.strip_prefix("int(")?.strip_suffix(')')?;
    let Some((min, max)) = body.split_once(',') else {
        return Some(Err(format!("malformed random range '{kind}'")));
    };
    let (Ok(min), Ok(max)) = (min.trim().parse::<i64>(), max.trim().parse::<i64>()) else {
        return Some(Err(format!("malformed random range '{kind}'")));
    };
    if min > max {
        return Some(Err(format!("empty random range '{kind}'")));
    }
    Some(Ok(rng.random_range(min..=max).to_string()))
}

/// Weighted label draw over a uniform integer in [0,100).
///
/// Weights are cumulative thresholds: `10:red,30:green,70:blue` gives red
/// 10%, green 20%, blue 40%, and the remaining 30% falls to the trailing
/// unweighted default label when one is declared.
fn dist100(spec: &str, path: &str) -> ConfigResult<String> {
    let mut thresholds: Vec<(u32, &str)> = Vec::new();
    let mut default_label: Option<&str> = None;

    for (i, entry) in spec.split(',').enumerate() {
        let entry = entry.trim();
        match entry.split_once(':') {
            Some((weight, label)) => {
                if default_label.is_some() {
                    return ConfigResult::err(ValidationError::decode(
                        path,
                        format!("dist100 default label must be last in '{spec}'"),
                    ));
                }
                let Ok(weight) = weight.trim().parse::<u32>() else {
                    return ConfigResult::err(ValidationError::decode(
                        path,
                        format!("dist100 weight '{weight}' is not a non-negative integer"),
                    ));
                };
                if let Some(&(previous, _)) = thresholds.last() {
                    if weight <= previous {
                        return ConfigResult::err(ValidationError::decode(
                            path,
                            format!("dist100 thresholds must increase in '{spec}'"),
                        ));
                    }
                }
                thresholds.push((weight, label.trim()));
            }
            None => {
                if entry.is_empty() || default_label.is_some() {
                    return ConfigResult::err(ValidationError::decode(
                        path,
                        format!("malformed dist100 entry {i} in '{spec}'"),
                    ));
                }
                default_label = Some(entry);
            }
        }
    }

    if thresholds.is_empty() {
        return ConfigResult::err(ValidationError::decode(
            path,
            format!("dist100 needs at least one weighted label in '{spec}'"),
        ));
    }

    let draw = rand::rng().random_range(0..100u32);
    for (threshold, label) in &thresholds {
        if draw < *threshold {
            return ConfigResult::ok((*label).to_string());
        }
    }
    match default_label {
        Some(label) => ConfigResult::ok(label.to_string()),
        None => ConfigResult::err(ValidationError::decode(
            path,
            format!("dist100 draw {draw} matched no label and no default was declared"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keys_are_not_transforms() {
        assert!(apply("db.host", "p").is_none());
        assert!(apply("randomize.me", "p").is_none());
    }

    #[test]
    fn random_int_parses() {
        let result = apply("random:int", "p").unwrap();
        let value = result.value.unwrap();
        assert!(value.parse::<i32>().is_ok());
    }

    #[test]
    fn random_ranged_int_stays_in_bounds() {
        for _ in 0..50 {
            let result = apply("random:int(5,9)", "p").unwrap();
            let value: i64 = result.value.unwrap().parse().unwrap();
            assert!((5..=9).contains(&value));
        }
    }

    #[test]
    fn random_unknown_kind_is_an_error() {
        let result = apply("random:uuid7", "p").unwrap();
        assert!(result.value.is_none());
        assert!(result.errors[0].message.contains("unknown random kind"));
    }

    #[test]
    fn dist100_defaults_when_no_threshold_matches() {
        let mut saw_default = false;
        for _ in 0..200 {
            let result = apply("dist100:1:tiny,rest", "p").unwrap();
            let label = result.value.unwrap();
            assert!(label == "tiny" || label == "rest");
            saw_default |= label == "rest";
        }
        assert!(saw_default, "199/200 odds per draw should hit the default");
    }

    #[test]
    fn dist100_without_default_can_miss() {
        let mut missed = false;
        for _ in 0..200 {
            let result = apply("dist100:1:tiny", "p").unwrap();
            if result.value.is_none() {
                assert!(result.errors[0].message.contains("matched no label"));
                missed = true;
            }
        }
        assert!(missed);
    }

    #[test]
    fn dist100_rejects_malformed_specs() {
        assert!(apply("dist100:abc:red", "p").unwrap().value.is_none());
        assert!(apply("dist100:30:red,10:green", "p").unwrap().value.is_none());
        assert!(apply("dist100:fallback,10:red", "p").unwrap().value.is_none());
    }
}
