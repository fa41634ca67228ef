//! Utility functions for the container
//!
//! Naming conventions for generated bean names and static analysis of the
//! declared `depends_on` graph.

/// Naming convention utilities for bean names
pub mod naming {
    /// Separator between a generated bean name and its uniqueness counter.
    pub const GENERATED_BEAN_NAME_SEPARATOR: &str = "#";

    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// `UserService` becomes `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Strips module path and generic arguments from a Rust type name.
    ///
    /// ```
    /// use arbor_core::utils::naming::short_type_name;
    ///
    /// assert_eq!(short_type_name("app::service::UserService"), "UserService");
    /// assert_eq!(short_type_name("alloc::vec::Vec<i32>"), "Vec");
    /// ```
    pub fn short_type_name(type_name: &str) -> &str {
        let without_generics = type_name.split('<').next().unwrap_or(type_name);
        without_generics
            .rsplit("::")
            .next()
            .unwrap_or(without_generics)
    }

    /// Default bean name for a type: short type name in camelCase.
    pub fn generate_bean_name(type_name: &str) -> String {
        to_camel_case(short_type_name(type_name))
    }

    /// Appends a counter to a generated name until `is_taken` reports it free.
    ///
    /// Used for inner beans, which need a unique name but are never looked up
    /// by that name.
    pub fn unique_bean_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
        let mut counter = 0usize;
        loop {
            let candidate = format!("{}{}{}", base, GENERATED_BEAN_NAME_SEPARATOR, counter);
            if !is_taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet};

    /// Dependency graph analysis result
    #[derive(Debug)]
    pub enum DependencyValidationError {
        /// Circular dependency detected
        CircularDependency {
            /// The dependency chain forming the cycle
            cycle: Vec<String>,
        },
        /// Missing dependency detected
        MissingDependency {
            /// The bean that requires the dependency
            bean: String,
            /// The missing dependency
            missing: String,
        },
    }

    impl std::fmt::Display for DependencyValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CircularDependency { cycle } => {
                    write!(f, "Circular depends-on relationship: {}", cycle.join(" -> "))
                }
                Self::MissingDependency { bean, missing } => {
                    write!(f, "Bean '{}' depends on '{}' which is not registered", bean, missing)
                }
            }
        }
    }

    impl std::error::Error for DependencyValidationError {}

    /// Validates a dependency graph for circular dependencies and missing beans
    ///
    /// Returns the first detected issue.
    pub fn validate_dependency_graph(
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<(), DependencyValidationError> {
        // Check for missing dependencies
        for (bean_name, deps) in dependencies {
            for dep in deps {
                if !dependencies.contains_key(dep) {
                    return Err(DependencyValidationError::MissingDependency {
                        bean: bean_name.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        // Check for circular dependencies using DFS
        let mut visited = HashSet::new();
        let mut rec_stack = Vec::new();

        let mut roots: Vec<&String> = dependencies.keys().collect();
        roots.sort();
        for bean_name in roots {
            if !visited.contains(bean_name) {
                if let Some(cycle) =
                    detect_cycle_dfs(bean_name, dependencies, &mut visited, &mut rec_stack)
                {
                    return Err(DependencyValidationError::CircularDependency { cycle });
                }
            }
        }

        Ok(())
    }

    /// DFS-based cycle detection
    fn detect_cycle_dfs(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        rec_stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.push(node.to_string());

        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if let Some(start_idx) = rec_stack.iter().position(|x| x == dep) {
                    let mut cycle = rec_stack[start_idx..].to_vec();
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = detect_cycle_dfs(dep, graph, visited, rec_stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        rec_stack.pop();
        None
    }

    /// Performs topological sort on a dependency graph
    ///
    /// Returns bean names with dependencies before dependents, or an error
    /// message if the graph has a cycle.
    pub fn topological_sort(
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<Vec<String>, String> {
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();

        // For each bean -> [deps], add edges from deps to bean
        for (bean, deps) in dependencies {
            *in_degree.entry(bean.clone()).or_insert(0) += deps.len();

            for dep in deps {
                in_degree.entry(dep.clone()).or_insert(0);
                graph.entry(dep.clone()).or_default().push(bean.clone());
            }
        }

        let mut queue: Vec<String> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(bean, _)| bean.clone())
            .collect();
        queue.sort_by(|a, b| b.cmp(a));

        let mut result = Vec::new();

        while let Some(node) = queue.pop() {
            if let Some(dependents) = graph.get(&node) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push(dependent.clone());
                        }
                    }
                }
            }
            result.push(node);
        }

        if result.len() != in_degree.len() {
            return Err("Circular dependency detected during topological sort".to_string());
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    mod naming_tests {
        use super::super::naming::*;

        #[test]
        fn test_to_camel_case() {
            assert_eq!(to_camel_case("UserService"), "userService");
            assert_eq!(to_camel_case("AB"), "aB");
            assert_eq!(to_camel_case(""), "");
            assert_eq!(to_camel_case("lowerCase"), "lowerCase");
        }

        #[test]
        fn test_generate_bean_name() {
            assert_eq!(generate_bean_name("demo::repo::OrderRepository"), "orderRepository");
            assert_eq!(generate_bean_name("Cache<String>"), "cache");
        }

        #[test]
        fn test_unique_bean_name_skips_taken() {
            let taken = ["inner#0".to_string(), "inner#1".to_string()];
            let name = unique_bean_name("inner", |candidate| taken.iter().any(|t| t == candidate));
            assert_eq!(name, "inner#2");
        }
    }

    mod dependency_tests {
        use super::super::dependency::*;
        use std::collections::HashMap;

        fn graph(edges: Vec<(&str, Vec<&str>)>) -> HashMap<String, Vec<String>> {
            edges
                .into_iter()
                .map(|(k, deps)| (k.to_string(), deps.into_iter().map(String::from).collect()))
                .collect()
        }

        #[test]
        fn test_validate_missing_dependency() {
            let deps = graph(vec![("serviceA", vec!["serviceB"])]);

            match validate_dependency_graph(&deps) {
                Err(DependencyValidationError::MissingDependency { bean, missing }) => {
                    assert_eq!(bean, "serviceA");
                    assert_eq!(missing, "serviceB");
                }
                other => panic!("Expected MissingDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_validate_circular_dependency() {
            let deps = graph(vec![
                ("serviceA", vec!["serviceB"]),
                ("serviceB", vec!["serviceC"]),
                ("serviceC", vec!["serviceA"]),
            ]);

            match validate_dependency_graph(&deps) {
                Err(DependencyValidationError::CircularDependency { cycle }) => {
                    assert_eq!(cycle.len(), 4);
                    assert_eq!(cycle.first(), cycle.last());
                }
                other => panic!("Expected CircularDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_validate_self_dependency() {
            let deps = graph(vec![("serviceA", vec!["serviceA"])]);

            match validate_dependency_graph(&deps) {
                Err(DependencyValidationError::CircularDependency { cycle }) => {
                    assert_eq!(cycle, vec!["serviceA".to_string(), "serviceA".to_string()]);
                }
                other => panic!("Expected CircularDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_topological_sort_orders_dependencies_first() {
            let deps = graph(vec![
                ("config", vec![]),
                ("database", vec!["config"]),
                ("userService", vec!["database", "config"]),
            ]);

            let sorted = topological_sort(&deps).unwrap();
            let pos = |name: &str| sorted.iter().position(|n| n == name).unwrap();
            assert!(pos("config") < pos("database"));
            assert!(pos("database") < pos("userService"));
        }

        #[test]
        fn test_topological_sort_rejects_cycle() {
            let deps = graph(vec![("a", vec!["b"]), ("b", vec!["a"])]);
            assert!(topological_sort(&deps).is_err());
        }
    }
}
