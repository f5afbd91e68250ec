//! Rendering a user profile for prompts

use userstore::UserProfile;

/// Text used when no profile is stored for the user
pub const NO_PROFILE: &str = "No biometric data available for this user.";

fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|s| !s.trim().is_empty()).unwrap_or(fallback)
}

fn num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// Format the biometric block included in every prompt
pub fn format_profile(profile: Option<&UserProfile>) -> String {
    let Some(p) = profile else {
        return NO_PROFILE.to_string();
    };
    let goals = &p.fitness_goals;

    let lines = [
        "User's Biometric Data:".to_string(),
        format!("- Name: {}", or(p.name.as_deref(), "N/A")),
        format!(
            "- Age: {} years",
            p.age.map(|a| a.to_string()).unwrap_or_else(|| "N/A".to_string())
        ),
        format!("- Height: {} cm", num(p.height)),
        format!("- Weight: {} kg", num(p.weight)),
        format!("- Health Conditions: {}", or(p.health_conditions.as_deref(), "None")),
        format!("- Food Allergies: {}", or(p.food_allergies.as_deref(), "None")),
        format!("- Preference Food: {}", or(p.preference_food.as_deref(), "None")),
        format!(
            "- Fitness Goals: Endurance({}), Muscle Gain({}), Strength({}), Weight Loss({})",
            goals.endurance, goals.muscle_gain, goals.strength, goals.weight_loss
        ),
        format!("- Workout Level: {}", or(p.workout_level.as_deref(), "N/A")),
        format!("- Last Updated: {}", or(p.last_updated.as_deref(), "N/A")),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use userstore::FitnessGoals;

    #[test]
    fn test_format_missing_profile() {
        assert_eq!(format_profile(None), NO_PROFILE);
    }

    #[test]
    fn test_format_full_profile() {
        let profile = UserProfile {
            name: Some("Dana".to_string()),
            age: Some(34),
            height: Some(170.0),
            weight: Some(68.5),
            food_allergies: Some("peanuts".to_string()),
            fitness_goals: FitnessGoals {
                endurance: true,
                weight_loss: true,
                ..Default::default()
            },
            workout_level: Some("very mild".to_string()),
            ..Default::default()
        };

        let text = format_profile(Some(&profile));
        assert!(text.starts_with("User's Biometric Data:\n- Name: Dana\n- Age: 34 years"));
        assert!(text.contains("- Height: 170 cm"));
        assert!(text.contains("- Weight: 68.5 kg"));
        assert!(text.contains("- Health Conditions: None"));
        assert!(text.contains("- Food Allergies: peanuts"));
        assert!(text.contains("Endurance(true), Muscle Gain(false), Strength(false), Weight Loss(true)"));
        assert!(text.contains("- Workout Level: very mild"));
        assert!(text.ends_with("- Last Updated: N/A"));
    }
}
