// src/engine/generator.rs

//! Parametric questions. A template id inside a session is materialised on
//! demand from the session seed, so a reload always reproduces the same values.

use crate::engine::rng::{Mulberry32, hash_string_to_seed};
use crate::models::question::{
    GeneratedValues, Question, QuestionBody, QuestionTemplate, TemplateKind, WrittenBody,
};

const PED_MARK_SCHEME: [&str; 3] = [
    "Correct midpoint PED calculation",
    "Correct sign and magnitude",
    "Correct interpretation (elastic/inelastic/unit elastic)",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question: Question,
    pub values: GeneratedValues,
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Two distinct values from `[min, max]`; a collision is nudged by one step.
fn distinct_pair(rng: &mut Mulberry32, min: i64, max: i64) -> (i64, i64) {
    let first = rng.pick_int(min, max);
    let mut second = rng.pick_int(min, max);
    if first == second {
        second = if first == max { first - 1 } else { first + 1 };
    }
    (first, second)
}

/// Rounds half-up to two decimals (ties go towards positive infinity).
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

pub fn interpret_ped(value: f64) -> &'static str {
    let magnitude = value.abs();
    if (magnitude - 1.0).abs() <= 0.05 {
        "Unit elastic"
    } else if magnitude > 1.0 {
        "Elastic"
    } else {
        "Inelastic"
    }
}

pub fn generate_ped_midpoint_question(template: &QuestionTemplate, seed: u32) -> GeneratedQuestion {
    let mut rng = Mulberry32::new(hash_string_to_seed(&format!("{}-{}", seed, template.id)));
    let (price_min, price_max) = ordered(template.ranges.price_min, template.ranges.price_max);
    let (quantity_min, quantity_max) =
        ordered(template.ranges.quantity_min, template.ranges.quantity_max);

    let (p1, p2) = distinct_pair(&mut rng, price_min, price_max);
    let (p1, p2) = ordered(p1, p2);
    let (q_a, q_b) = distinct_pair(&mut rng, quantity_min, quantity_max);
    let (q2, q1) = ordered(q_a, q_b);

    let (p1f, p2f, q1f, q2f) = (p1 as f64, p2 as f64, q1 as f64, q2 as f64);
    let percent_delta_q = (q2f - q1f) / ((q1f + q2f) / 2.0);
    let percent_delta_p = (p2f - p1f) / ((p1f + p2f) / 2.0);
    let ped = round2(percent_delta_q / percent_delta_p);
    let interpretation = interpret_ped(ped);

    let prompt = template
        .prompt
        .replacen("{p1}", &p1.to_string(), 1)
        .replacen("{p2}", &p2.to_string(), 1)
        .replacen("{q1}", &q1.to_string(), 1)
        .replacen("{q2}", &q2.to_string(), 1);

    let question = Question {
        id: format!("{}-{}", template.id, seed),
        topic: template.topic.clone(),
        points: template.points,
        prompt,
        body: QuestionBody::ShortAnswer(WrittenBody {
            mark_scheme: PED_MARK_SCHEME.iter().map(|s| s.to_string()).collect(),
            model_answer: format!("Midpoint PED = {}. Interpretation: {}.", ped, interpretation),
        }),
    };

    GeneratedQuestion {
        question,
        values: GeneratedValues {
            p1,
            p2,
            q1,
            q2,
            ped,
            interpretation: interpretation.to_string(),
        },
    }
}

pub fn generate(template: &QuestionTemplate, seed: u32) -> GeneratedQuestion {
    match template.template {
        TemplateKind::PedMidpoint => generate_ped_midpoint_question(template, seed),
    }
}
