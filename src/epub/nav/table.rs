//! 导航表数据结构定义
//!
//! 导航表是一棵带标签的导航点树（目录、地标、页码列表等），以类型名为键。

/// 导航点
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPoint {
    /// 导航标签
    pub label: String,
    /// 相对于包文档的目标路径（可带片段），纯标题项没有目标
    pub target: Option<String>,
    /// 子导航点
    pub children: Vec<NavigationPoint>,
}

impl NavigationPoint {
    /// 创建新的导航点
    pub fn new(label: impl Into<String>, target: Option<String>) -> Self {
        Self {
            label: label.into(),
            target,
            children: Vec::new(),
        }
    }

    /// 添加子导航点
    pub fn add_child(&mut self, child: NavigationPoint) {
        self.children.push(child);
    }

    /// 目标路径去掉片段后的部分
    pub fn target_path(&self) -> Option<&str> {
        self.target
            .as_deref()
            .map(|target| target.split_once('#').map_or(target, |(path, _)| path))
    }

    /// 获取导航深度
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(NavigationPoint::depth).max().unwrap_or(0)
    }

    fn collect<'a>(&'a self, points: &mut Vec<&'a NavigationPoint>) {
        points.push(self);
        for child in &self.children {
            child.collect(points);
        }
    }
}

/// 导航表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationTable {
    /// 表的类型名（toc、landmarks、page-list等），即映射中的键
    pub title: String,
    /// 表头文本
    pub heading: Option<String>,
    /// 顶层导航点
    pub points: Vec<NavigationPoint>,
}

impl NavigationTable {
    /// 创建新的导航表
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            heading: None,
            points: Vec::new(),
        }
    }

    /// 添加顶层导航点
    pub fn add_point(&mut self, point: NavigationPoint) {
        self.points.push(point);
    }

    /// 先序遍历得到的全部导航点
    pub fn all_points(&self) -> Vec<&NavigationPoint> {
        let mut points = Vec::new();
        for point in &self.points {
            point.collect(&mut points);
        }
        points
    }

    /// 获取导航深度
    pub fn depth(&self) -> usize {
        self.points.iter().map(NavigationPoint::depth).max().unwrap_or(0)
    }

    /// 第一个目标（忽略片段）为给定路径的导航点
    pub fn find_by_target_path(&self, path: &str) -> Option<&NavigationPoint> {
        self.all_points()
            .into_iter()
            .find(|point| point.target_path() == Some(path))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NavigationTable {
        let mut part = NavigationPoint::new("第一部", None);
        part.add_child(NavigationPoint::new("第一章", Some("text/c1.xhtml".to_string())));
        part.add_child(NavigationPoint::new("第二章", Some("text/c2.xhtml#sec".to_string())));

        let mut table = NavigationTable::new("toc");
        table.add_point(part);
        table.add_point(NavigationPoint::new("后记", Some("text/end.xhtml".to_string())));
        table
    }

    #[test]
    fn test_preorder_and_depth() {
        let table = sample();
        let labels: Vec<&str> = table.all_points().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["第一部", "第一章", "第二章", "后记"]);
        assert_eq!(table.depth(), 2);
        assert_eq!(NavigationTable::new("landmarks").depth(), 0);
    }

    #[test]
    fn test_find_by_target_path_ignores_fragment() {
        let table = sample();
        assert_eq!(table.find_by_target_path("text/c2.xhtml").unwrap().label, "第二章");
        assert!(table.find_by_target_path("text/missing.xhtml").is_none());
    }
}
