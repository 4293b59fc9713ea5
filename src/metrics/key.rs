/// Builds the registry key of a task from its id and namespace.
///
/// The key is the plain concatenation `<id>-<namespace>`.
///
/// # Examples
///
/// ```
/// # use creo_exporter::metrics::task_key;
/// assert_eq!(task_key("container1", "default"), "container1-default");
/// assert_eq!(task_key("", ""), "-");
/// ```
pub fn task_key(id: &str, namespace: &str) -> String {
    let mut key = String::with_capacity(id.len() + namespace.len() + 1);
    key.push_str(id);
    key.push('-');
    key.push_str(namespace);
    key
}
