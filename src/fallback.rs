//! Built-in questions served when generation is unavailable.

use crate::question::{Choice, Question};

/// A source of questions that cannot fail.
pub trait FallbackProvider: Send + Sync {
    /// The full question set, in a fixed order.
    fn questions(&self) -> Vec<Question>;
}

/// Five hand-written SAFe POPM questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticQuestions;

impl FallbackProvider for StaticQuestions {
    fn questions(&self) -> Vec<Question> {
        vec![
            Question::new(
                "What is SAFe's primary approach to Lean-Agile adoption?",
                vec![
                    Choice::new("Bottom-up implementation across teams", false),
                    Choice::new("Top-down implementation starting with leadership training", true),
                    Choice::new("Middle-out implementation focusing on program managers", false),
                    Choice::new("Implementation through external consultants only", false),
                ],
                "SAFe advocates a top-down implementation approach, starting with training leaders, as this accelerates organizational change.",
            ),
            Question::new(
                "What are the four Core Values of SAFe?",
                vec![
                    Choice::new("Transparency, Inspection, Adaptation, Relentless Improvement", false),
                    Choice::new("Alignment, Built-in Quality, Transparency, Program Execution", true),
                    Choice::new("Respect for People, Flow, Innovation, Relentless Improvement", false),
                    Choice::new("Trust, Value, Efficiency, Delivery", false),
                ],
                "The four Core Values of SAFe are Alignment, Built-in Quality, Transparency, and Program Execution.",
            ),
            Question::new(
                "In SAFe, what is the primary purpose of PI Planning?",
                vec![
                    Choice::new("To create a detailed backlog for the next 6-12 months", false),
                    Choice::new(
                        "To align teams to a common mission and vision for the next Program Increment",
                        true,
                    ),
                    Choice::new("To evaluate the performance of individual team members", false),
                    Choice::new("To create a project budget for the fiscal year", false),
                ],
                "PI Planning aligns teams to a common mission and creates the PI plan with objectives for the upcoming Program Increment.",
            ),
            Question::new(
                "What is a key responsibility of the Product Owner in SAFe?",
                vec![
                    Choice::new("Writing detailed technical specifications", false),
                    Choice::new("Managing team dynamics and resolving conflicts", false),
                    Choice::new("Defining and prioritizing the team backlog", true),
                    Choice::new("Conducting performance reviews of team members", false),
                ],
                "The Product Owner is responsible for defining Stories and prioritizing the Team Backlog to streamline the execution of Program priorities.",
            ),
            Question::new(
                "What is the recommended number of ARTs in a Value Stream?",
                vec![
                    Choice::new("1-5", true),
                    Choice::new("6-10", false),
                    Choice::new("11-15", false),
                    Choice::new("There is no recommended number", false),
                ],
                "SAFe recommends 1-5 ARTs per Value Stream, with 50-125 people per ART.",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_set_is_deterministic_and_well_formed() {
        let first = StaticQuestions.questions();
        assert_eq!(first.len(), 5);
        assert_eq!(first, StaticQuestions.questions());
        assert!(first.iter().all(Question::is_well_formed));
    }

    #[test]
    fn correct_answers_match_the_explanations() {
        let qs = StaticQuestions.questions();
        assert_eq!(qs[3].correct_index(), Some(2));
        assert_eq!(qs[4].correct_choice().map(|c| c.text.as_str()), Some("1-5"));
    }
}
