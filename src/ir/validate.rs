//! Dependency validation of compiled workflows.
//!
//! Within a workflow, a child consumes its parameters from the workflow's
//! parameters or from the returns of its siblings. This pass checks that
//! every input has a producer and that the producer/consumer relation
//! between siblings is acyclic. Unlike compilation it reports all problems
//! it finds.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::ir::types::*;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
    /// The step identifier where the error was found.
    pub step_id: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.step_id {
            Some(id) => write!(f, "[{}] {} (at step '{}')", self.code, self.message, id),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Validate every workflow in the tree rooted at `step`.
pub fn validate_definition(step: &StepDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let StepDefinition::Workflow(workflow) = step {
        validate_workflow(workflow, &mut errors);
    }
    tracing::debug!(
        workflow = step.identifier(),
        errors = errors.len(),
        "validated dependencies"
    );
    errors
}

/// Child identifiers of `workflow` in an order where every producer comes
/// before its consumers. Ties keep document order.
pub fn execution_order(workflow: &WorkflowStep) -> Result<Vec<&str>, ValidationError> {
    let deps = SiblingGraph::build(workflow);
    if let Err(cycle) = toposort(&deps.graph, None) {
        return Err(cycle_error(workflow, &deps.graph, cycle.node_id()));
    }

    let mut in_degree: Vec<usize> = deps
        .graph
        .node_indices()
        .map(|n| deps.graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut done = vec![false; in_degree.len()];
    let mut order = Vec::with_capacity(in_degree.len());

    while order.len() < in_degree.len() {
        let Some(next) = (0..in_degree.len()).find(|&i| !done[i] && in_degree[i] == 0) else {
            break;
        };
        done[next] = true;
        order.push(workflow.steps[next].identifier());
        for succ in deps.graph.neighbors_directed(NodeIndex::new(next), Direction::Outgoing) {
            in_degree[succ.index()] -= 1;
        }
    }
    Ok(order)
}

/// Producer → consumer edges between the children of one workflow.
///
/// Node `i` of the graph is child `i` of the workflow.
struct SiblingGraph {
    graph: DiGraph<usize, String>,
    producers: HashMap<String, usize>,
    /// Returns produced by more than one child: (name, first, second).
    duplicates: Vec<(String, usize, usize)>,
}

impl SiblingGraph {
    fn build(workflow: &WorkflowStep) -> Self {
        let mut graph = DiGraph::new();
        for i in 0..workflow.steps.len() {
            graph.add_node(i);
        }

        let mut producers = HashMap::new();
        let mut duplicates = Vec::new();
        for (i, child) in workflow.steps.iter().enumerate() {
            for ret in child.returns() {
                match producers.get(&ret.name) {
                    Some(&first) => duplicates.push((ret.name.clone(), first, i)),
                    None => {
                        producers.insert(ret.name.clone(), i);
                    }
                }
            }
        }

        for (i, child) in workflow.steps.iter().enumerate() {
            let mut seen = HashSet::new();
            for param in child.parameters() {
                if let Some(&producer) = producers.get(&param.name) {
                    if producer != i && seen.insert(producer) {
                        graph.add_edge(
                            NodeIndex::new(producer),
                            NodeIndex::new(i),
                            param.name.clone(),
                        );
                    }
                }
            }
        }

        SiblingGraph {
            graph,
            producers,
            duplicates,
        }
    }
}

fn validate_workflow(workflow: &WorkflowStep, errors: &mut Vec<ValidationError>) {
    let id = Some(workflow.identifier.clone());

    if workflow.steps.is_empty() {
        errors.push(ValidationError {
            code: "E005",
            message: format!("Workflow '{}' has no steps", workflow.identifier),
            step_id: id.clone(),
        });
    }

    let deps = SiblingGraph::build(workflow);

    for (name, first, second) in &deps.duplicates {
        errors.push(ValidationError {
            code: "E001",
            message: format!(
                "Value '{}' is returned by both '{}' and '{}'",
                name,
                workflow.steps[*first].identifier(),
                workflow.steps[*second].identifier()
            ),
            step_id: id.clone(),
        });
    }

    for (i, child) in workflow.steps.iter().enumerate() {
        for param in child.parameters() {
            let produced = matches!(deps.producers.get(&param.name), Some(&p) if p != i);
            let supplied = workflow.parameter(&param.name).is_some() || param.value.is_some();
            if !produced && !supplied {
                errors.push(ValidationError {
                    code: "E002",
                    message: format!(
                        "Parameter '{}' of '{}' is neither a parameter of '{}' nor returned by a sibling step",
                        param.name,
                        child.identifier(),
                        workflow.identifier
                    ),
                    step_id: Some(child.identifier().to_string()),
                });
            }
        }
    }

    for ret in &workflow.returns {
        let produced = deps.producers.contains_key(&ret.name);
        if !produced && workflow.parameter(&ret.name).is_none() {
            errors.push(ValidationError {
                code: "E003",
                message: format!(
                    "Return '{}' of '{}' is not produced by any of its steps",
                    ret.name, workflow.identifier
                ),
                step_id: id.clone(),
            });
        }
    }

    if is_cyclic_directed(&deps.graph) {
        if let Err(cycle) = toposort(&deps.graph, None) {
            errors.push(cycle_error(workflow, &deps.graph, cycle.node_id()));
        }
    }

    for child in &workflow.steps {
        if let StepDefinition::Workflow(nested) = child {
            validate_workflow(nested, errors);
        }
    }
}

fn cycle_error(
    workflow: &WorkflowStep,
    graph: &DiGraph<usize, String>,
    at: NodeIndex,
) -> ValidationError {
    let step = workflow.steps[graph[at]].identifier();
    ValidationError {
        code: "E004",
        message: format!(
            "Steps of '{}' depend on each other in a cycle through '{}'",
            workflow.identifier, step
        ),
        step_id: Some(step.to_string()),
    }
}
