/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

const LICENSE: &str = "\
#
# Licensed under the Apache License, Version 2.0 (the \"License\");
# you may not use this file except in compliance with the License.
# You may obtain a copy of the License at
#
#      https://www.apache.org/licenses/LICENSE-2.0
#
# Unless required by applicable law or agreed to in writing, software
# distributed under the License is distributed on an \"AS IS\" BASIS,
# WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
# See the License for the specific language governing permissions and
# limitations under the License.
";

/// The copyright line at the top of every generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub year: i32,
    pub holder: String,
}

impl Header {
    pub fn new<S: Into<String>>(year: i32, holder: S) -> Header {
        Header {
            year,
            holder: holder.into(),
        }
    }
}

/// Assembles a complete CMakeLists.txt from the converted rule blocks.
pub fn render<S: AsRef<str>>(header: &Header, subdirs: &[S], body: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!("# Copyright {} {}\n", header.year, header.holder));
    text.push_str(LICENSE);
    text.push('\n');
    for dir in subdirs {
        text.push_str(&format!("add_subdirectory({})\n", dir.as_ref()));
    }
    text.push('\n');
    text.push_str(body);
    normalize(&text)
}

/// Collapses runs of blank lines into one and terminates the text with a single newline.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    for line in text.trim_end().lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if blank {
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
        }
        previous_blank = blank;
    }
    out
}
