use std::collections::HashMap;

use crate::types::{NormalizedResult, ResultGroup};

/// 按父文件夹分组。分组顺序为文件夹首次出现的顺序，组内保持到达顺序。
///
/// 不同服务器上同名的文件夹会合并到同一组。
pub fn group(results: Vec<NormalizedResult>) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        match index.get(&result.parent_folder) {
            Some(&i) => groups[i].files.push(result),
            None => {
                index.insert(result.parent_folder.clone(), groups.len());
                groups.push(ResultGroup {
                    folder_name: result.parent_folder.clone(),
                    files: vec![result],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(folder: &str, name: &str, server: &str) -> NormalizedResult {
        NormalizedResult {
            file_name: name.to_string(),
            download_url: format!("http://host/{folder}/{name}"),
            extension: ".mkv".to_string(),
            size_label: "Unknown".to_string(),
            parent_folder: folder.to_string(),
            source_server: server.to_string(),
        }
    }

    #[test]
    fn first_seen_folder_order() {
        let groups = group(vec![
            file("X", "f1.mkv", "A"),
            file("Y", "f2.mkv", "A"),
            file("X", "f3.mkv", "A"),
        ]);
        let folders: Vec<_> = groups.iter().map(|g| g.folder_name.as_str()).collect();
        assert_eq!(folders, ["X", "Y"]);
        let names: Vec<_> = groups[0].files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["f1.mkv", "f3.mkv"]);
    }

    #[test]
    fn same_folder_name_across_servers_merges() {
        let groups = group(vec![file("Movies", "a.mkv", "A"), file("Movies", "b.mkv", "B")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files[1].source_server, "B");
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group(Vec::new()).is_empty());
    }
}
